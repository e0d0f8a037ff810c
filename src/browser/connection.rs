use crate::error::Result;
use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// 连接到已经在运行的浏览器（DevTools 地址，如 `http://localhost:9222`）
///
/// 返回浏览器句柄和后台事件循环任务
pub async fn connect_to_browser(debug_url: &str) -> Result<(Browser, JoinHandle<()>)> {
    info!("正在连接到浏览器: {}", debug_url);

    let (browser, handler) = Browser::connect(debug_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    Ok((browser, spawn_handler(handler)))
}

/// 在后台处理浏览器事件，出错即退出
pub(crate) fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}
