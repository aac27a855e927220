use anyhow::Context;
use winit::{event_loop::EventLoop, window::CursorGrabMode};

use crate::{
    assets::WaterAssets,
    config::{AppConfig, Args},
    engine::window::{Surface, SurfaceContext},
    game::Game,
};

pub async fn common_main(event_loop: EventLoop<()>, args: Args) -> anyhow::Result<()> {
    let config = AppConfig::from_args(&args).context("failed to load config")?;
    let assets = WaterAssets::load(&config.water).await.context("failed to load water assets")?;
    let ready = |surface_context: &SurfaceContext| {
        let window = surface_context.window();
        if window.set_cursor_grab(CursorGrabMode::Locked).is_err() {
            let _ = window.set_cursor_grab(CursorGrabMode::Confined);
        }
        window.set_cursor_visible(false);
        Game::new(surface_context, &config, &assets)
    };
    let mut surface = Surface::new(ready);
    event_loop.run_app(&mut surface)?;
    match surface.take_error() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
