use anyhow::Result;
use fofa_export::utils::logging;
use fofa_export::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置：指定 FOFA_CONFIG 时读取 TOML，否则只用环境变量
    let config = match std::env::var("FOFA_CONFIG") {
        Ok(path) => Config::from_toml_file(path)?,
        Err(_) => Config::from_env(),
    };

    // 初始化日志（控制台 + 日志文件）
    logging::init(&config.output_log_file)?;

    // 初始化并运行应用
    App::initialize(config)?.run().await?;

    Ok(())
}
