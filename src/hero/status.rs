use super::components::{HeroEntity, LoadStatusOverlay, LoadStatusText};
use super::loader::{LoadStatus, ModelLoad};
use bevy::prelude::*;

pub const LOADING_MESSAGE: &str = "Loading 3D Model...";
pub const FAILED_MESSAGE: &str = "3D model failed to load";

pub(super) fn spawn_status_overlay(commands: &mut Commands) {
    commands
        .spawn((
            LoadStatusOverlay,
            HeroEntity,
            GlobalZIndex(500),
            Node {
                position_type: PositionType::Absolute,
                width: percent(100),
                height: percent(100),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.5)),
        ))
        .with_children(|root| {
            root.spawn((
                Text::new(LOADING_MESSAGE),
                TextFont::from_font_size(24.0),
                TextColor(Color::WHITE),
                LoadStatusText,
            ));
        });
}

/// Text the overlay shows for a load status, or `None` once it should hide.
pub fn status_message(status: &LoadStatus) -> Option<&'static str> {
    match status {
        LoadStatus::Pending => Some(LOADING_MESSAGE),
        LoadStatus::Loaded { .. } => None,
        LoadStatus::Failed(_) => Some(FAILED_MESSAGE),
    }
}

pub(super) fn update_status_overlay(
    load: Res<ModelLoad>,
    mut overlays: Query<&mut Visibility, With<LoadStatusOverlay>>,
    mut texts: Query<&mut Text, With<LoadStatusText>>,
) {
    if !load.is_changed() {
        return;
    }

    let message = status_message(&load.status);
    for mut visibility in &mut overlays {
        *visibility = if message.is_some() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
    if let Some(message) = message {
        for mut text in &mut texts {
            if text.0 != message {
                text.0 = message.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hero::errors::LoadError;
    use crate::hero::loader::LoadTicket;

    fn app_with(status: LoadStatus) -> App {
        let mut app = App::new();
        app.insert_resource(ModelLoad {
            ticket: LoadTicket(1),
            path: "models/battery-otp.glb".to_string(),
            handle: Handle::default(),
            status,
        });
        app.world_mut().spawn((LoadStatusOverlay, Visibility::Inherited));
        app.world_mut()
            .spawn((Text::new(LOADING_MESSAGE), LoadStatusText));
        app.add_systems(Update, update_status_overlay);
        app
    }

    fn overlay_visibility(app: &mut App) -> Visibility {
        let mut query = app
            .world_mut()
            .query_filtered::<&Visibility, With<LoadStatusOverlay>>();
        *query.single(app.world()).unwrap()
    }

    fn status_text(app: &mut App) -> String {
        let mut query = app.world_mut().query_filtered::<&Text, With<LoadStatusText>>();
        query.single(app.world()).unwrap().0.clone()
    }

    #[test]
    fn loaded_model_hides_overlay() {
        let mut app = app_with(LoadStatus::Loaded {
            meshes: 2,
            overlays: 22,
        });
        app.update();
        assert_eq!(overlay_visibility(&mut app), Visibility::Hidden);
    }

    #[test]
    fn failure_shows_fallback_message() {
        let mut app = app_with(LoadStatus::Failed(LoadError::Failed {
            path: "models/battery-otp.glb".to_string(),
            reason: "network error".to_string(),
        }));
        app.update();

        assert_eq!(overlay_visibility(&mut app), Visibility::Inherited);
        assert_eq!(status_text(&mut app), FAILED_MESSAGE);
    }

    #[test]
    fn pending_keeps_loading_message() {
        let mut app = app_with(LoadStatus::Pending);
        app.update();
        assert_eq!(status_text(&mut app), LOADING_MESSAGE);
    }
}
