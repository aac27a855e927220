#[cfg(target_os = "android")]
use winit::platform::android::activity::AndroidApp;

pub mod assets;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod runner;
pub mod water;

#[no_mangle]
#[cfg(target_os = "android")]
fn android_main(app: AndroidApp) {
    use winit::event_loop::EventLoopBuilder;
    use winit::platform::android::EventLoopBuilderExtAndroid;

    android_logger::init_once(android_logger::Config::default().with_max_level(log::LevelFilter::Info));

    let event_loop = match EventLoopBuilder::new().with_android_app(app).build() {
        Ok(event_loop) => event_loop,
        Err(error) => {
            log::error!("failed to create event loop: {error}");
            return;
        }
    };
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => {
            log::error!("failed to start runtime: {error}");
            return;
        }
    };
    if let Err(error) = runtime.block_on(runner::common_main(event_loop, config::Args::default())) {
        log::error!("{error:#}");
    }
}
