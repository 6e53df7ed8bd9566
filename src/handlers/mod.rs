//! HTTP 处理器模块

pub mod auth;
pub mod event;
pub mod health;

use crate::error::AppError;
use axum::{
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;

/// 请求体提取器
///
/// `application/x-www-form-urlencoded` 按表单解析，其他一律按 JSON 解析。
/// 解析失败统一返回 400。
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form_body(&req) {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Self(value))
        }
    }
}

fn is_form_body(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Login {
        username: String,
        password: String,
    }

    fn request(content_type: &str, body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_form_body() {
        let req = request(
            "application/x-www-form-urlencoded; charset=utf-8",
            "username=kite%40gmail.com&password=896LdB78",
        );

        let JsonOrForm(login) = JsonOrForm::<Login>::from_request(req, &()).await.unwrap();
        assert_eq!(login.username, "kite@gmail.com");
        assert_eq!(login.password, "896LdB78");
    }

    #[tokio::test]
    async fn test_json_body() {
        let req = request(
            "application/json",
            r#"{"username":"kite@gmail.com","password":"896LdB78"}"#,
        );

        let JsonOrForm(login) = JsonOrForm::<Login>::from_request(req, &()).await.unwrap();
        assert_eq!(login.username, "kite@gmail.com");
    }

    #[tokio::test]
    async fn test_incomplete_form_is_invalid_input() {
        let req = request("application/x-www-form-urlencoded", "username=kite");

        let result = JsonOrForm::<Login>::from_request(req, &()).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
