use clap::Parser;
use midsummer_water::{config::Args, runner::common_main};
use winit::event_loop::EventLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let event_loop = EventLoop::new()?;
    common_main(event_loop, args).await
}
