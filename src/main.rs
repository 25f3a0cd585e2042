fn main() {
    hero_scene::hero::run();
}
