use anyhow::Result;
use multi_client_ops::services::{ConsoleChannel, DryRunClient};
use multi_client_ops::{utils, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    utils::logging::init();

    // 加载配置
    let config = Config::from_env();

    // 初始化引擎并进入控制台交互
    let app = App::initialize(config, DryRunClient::new(), ConsoleChannel).await?;
    app.run_console().await?;

    Ok(())
}
