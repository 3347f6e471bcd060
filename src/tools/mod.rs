//! 动作层：注册表、执行器、参数 Schema 与领域动作

pub mod echo;
pub mod executor;
pub mod fetch_news;
pub mod http;
pub mod make_post_image;
pub mod publish_post;
pub mod registry;
pub mod schema;
pub mod upload_image;

pub use echo::EchoAction;
pub use executor::ActionExecutor;
pub use fetch_news::FetchNewsAction;
pub use http::build_http_client;
pub use make_post_image::MakePostImageAction;
pub use publish_post::PublishPostAction;
pub use registry::{Action, ActionRegistry, ActionSchema};
pub use schema::{args_schema, parse_args};
pub use upload_image::UploadImageAction;
