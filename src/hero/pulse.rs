use bevy::prelude::Vec2;

/// `amplitude * sin(frequency * t + phase)`. Cosine terms carry an extra
/// quarter turn of phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wave {
    pub amplitude: f32,
    pub frequency: f32,
    pub phase: f32,
}

impl Wave {
    pub const ZERO: Self = Self {
        amplitude: 0.0,
        frequency: 0.0,
        phase: 0.0,
    };

    pub const fn sin(amplitude: f32, frequency: f32, phase: f32) -> Self {
        Self {
            amplitude,
            frequency,
            phase,
        }
    }

    pub const fn cos(amplitude: f32, frequency: f32, phase: f32) -> Self {
        Self {
            amplitude,
            frequency,
            phase: phase + std::f32::consts::FRAC_PI_2,
        }
    }

    pub fn sample(&self, t: f32) -> f32 {
        self.amplitude * (self.frequency * t + self.phase).sin()
    }
}

/// A clamped oscillating scalar: base plus two waves plus a pointer term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    pub base: f32,
    pub primary: Wave,
    pub secondary: Wave,
    pub pointer_weight: f32,
    pub max: f32,
}

impl Pulse {
    pub const fn constant(value: f32) -> Self {
        Self {
            base: value,
            primary: Wave::ZERO,
            secondary: Wave::ZERO,
            pointer_weight: 0.0,
            max: f32::MAX,
        }
    }

    pub fn sample(&self, t: f32, pointer: Vec2) -> f32 {
        let influence = pointer.x.abs() + pointer.y.abs();
        let raw = self.base
            + self.primary.sample(t)
            + self.secondary.sample(t)
            + self.pointer_weight * influence;
        raw.clamp(0.0, self.max)
    }

    /// Largest value the pulse can reach with the pointer anywhere in the
    /// normalized square, before clamping.
    pub fn peak(&self) -> f32 {
        self.base
            + self.primary.amplitude.abs()
            + self.secondary.amplitude.abs()
            + self.pointer_weight.abs() * 2.0
    }
}
