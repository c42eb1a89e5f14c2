//! `toolbox://localhost/<id>` 协议：把存活结果句柄的字节交给 WebView。

use tauri::http::{Request, Response, StatusCode, header};

use super::ObjectUrlRegistry;

/// 处理一次协议请求。未知或已撤销的句柄返回 404。
pub fn respond(registry: &ObjectUrlRegistry, request: &Request<Vec<u8>>) -> Response<Vec<u8>> {
    let path = request.uri().path();

    let built = match registry.resolve(path) {
        Some((bytes, mime)) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime)
            .header(header::CACHE_CONTROL, "no-store")
            .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")
            .body(bytes.to_vec()),
        None => {
            log::debug!("结果句柄不存在或已撤销: {path}");
            Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Vec::new())
        }
    };

    built.unwrap_or_else(|err| {
        log::error!("构造协议响应失败: {err}");
        let mut response = Response::new(Vec::new());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
