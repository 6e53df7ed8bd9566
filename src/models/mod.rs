//! 数据模型模块
//! 用户、认证请求与受保护的活动资源

pub mod auth;
pub mod event;
pub mod user;
