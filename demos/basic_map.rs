use macroquad::prelude::*;
use macroquad_tilemap::TileMap;

fn window_conf() -> Conf {
    Conf {
        window_title: "Basic Map".into(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut map = TileMap::load("assets/map.json")
        .await
        .expect("Failed to load map");

    let mut camera = Camera2D::from_display_rect(Rect::new(0.0, 0.0, screen_width(), screen_height()));
    let base_zoom = camera.zoom;
    let mut zoom = 1.0f32;

    loop {
        clear_background(BLACK);

        let speed = 400.0 * get_frame_time() / zoom;
        if is_key_down(KeyCode::Left) {
            camera.target.x -= speed;
        }
        if is_key_down(KeyCode::Right) {
            camera.target.x += speed;
        }
        if is_key_down(KeyCode::Up) {
            camera.target.y -= speed;
        }
        if is_key_down(KeyCode::Down) {
            camera.target.y += speed;
        }
        let (_, wheel) = mouse_wheel();
        if wheel != 0.0 {
            zoom = (zoom * if wheel > 0.0 { 1.1 } else { 0.9 }).clamp(0.25, 8.0);
        }
        camera.zoom = base_zoom * zoom;

        set_camera(&camera);
        map.update_frame();
        let draws = map.draw_camera(&camera);

        let mouse = camera.screen_to_world(mouse_position().into());
        let solid = map.pixel_hit_test(mouse.x.floor() as i32, mouse.y.floor() as i32);

        set_default_camera();
        let stats = map.stats();
        draw_text(
            &format!(
                "FPS: {}  draws: {}  tiles: {}  solid: {}",
                get_fps(),
                draws,
                stats.tiles_rendered,
                solid
            ),
            20.0,
            40.0,
            30.0,
            RED,
        );

        next_frame().await;
    }
}
