use anyhow::{Context, Result};
use smart_grader::utils::logging;
use smart_grader::{App, Config};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // 可选参数：TOML 配置文件路径
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => Config::from_toml_file(&path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
