use gpu_life::{LifeApp, LifeOptions};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = LifeApp::new(LifeOptions::from_env())?;
    app.run()
}
