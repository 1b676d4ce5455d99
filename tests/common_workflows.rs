//! Integration tests for common Trellis workflows.
//!
//! Configuration, injection, controller registration and dispatch wired
//! together the way an application bootstraps.

use serde_json::json;
use std::sync::Mutex;
use trellis::logging::{LogConfig, LogFormat, LogLevel, LogOutput};
use trellis::prelude::*;
use trellis::trellis_config::ConfigManager;

struct PostStore {
    posts: Mutex<Vec<String>>,
}

impl PostStore {
    fn all(&self) -> Vec<String> {
        self.posts.lock().unwrap().clone()
    }

    fn add(&self, title: String) -> usize {
        let mut posts = self.posts.lock().unwrap();
        posts.push(title);
        posts.len() - 1
    }
}

impl Injectable for PostStore {
    fn construct(_: &mut Dependencies) -> Result<Self, Error> {
        Ok(PostStore {
            posts: Mutex::new(vec!["Hello".to_string()]),
        })
    }
}

struct PostsController {
    store: Arc<PostStore>,
}

impl Injectable for PostsController {
    fn construct(deps: &mut Dependencies) -> Result<Self, Error> {
        Ok(PostsController {
            store: deps.next()?,
        })
    }
}

impl Controller for PostsController {
    fn methods() -> Vec<ControllerMethod<Self>> {
        vec![
            ControllerMethod::action("index", |this: Arc<Self>, _params, _req| async move {
                Reply::json(&this.store.all())
            }),
            ControllerMethod::action("show", |this: Arc<Self>, params: RouteParams, _req| async move {
                let index = params
                    .get("id")
                    .and_then(|id| id.parse::<usize>().ok())
                    .ok_or_else(|| Error::not_found("no such post"))?;
                let title = this
                    .store
                    .all()
                    .get(index)
                    .cloned()
                    .ok_or_else(|| Error::not_found("no such post"))?;
                Ok::<_, Error>(Reply::html(format!("<h1>{}</h1>", title)))
            }),
            ControllerMethod::action(
                "create",
                |this: Arc<Self>, _params, request: Arc<HttpRequest>| async move {
                    let title = request
                        .input("title")?
                        .ok_or_else(|| Error::bad_request("title is required"))?;
                    let id = this.store.add(title);
                    Ok::<_, Error>(Reply::json(&json!({ "id": id }))?.status(HttpStatus::Created))
                },
            ),
            ControllerMethod::error_handler("fallback", |_this, status: HttpStatus| async move {
                Ok::<_, Error>(format!("{} - {}", status.code(), status.reason()))
            }),
        ]
    }

    fn declare(d: &Decorators) -> Result<(), Error> {
        d.controller::<Self>("/posts");
        d.inject::<Self>([ClassRef::of::<PostStore>()]);
        d.get.route("/")?.apply(d.method::<Self>("index")?)?;
        d.get.route("/:id")?.apply(d.method::<Self>("show")?)?;
        d.post.route("/")?.apply(d.method::<Self>("create")?)?;
        d.error(None).apply(d.method::<Self>("fallback")?)?;
        Ok(())
    }
}

struct BlogModule;

impl Injectable for BlogModule {
    fn construct(_: &mut Dependencies) -> Result<Self, Error> {
        Ok(BlogModule)
    }
}

impl Module for BlogModule {
    fn controllers(&self) -> Vec<ControllerRegistration> {
        vec![ControllerRegistration::of::<PostsController>()]
    }

    fn routes(&self) -> Vec<AnonymousRoute> {
        vec![AnonymousRoute::new(
            "/",
            vec![HttpMethod::GET],
            Action::new(trellis::handler::sync(|_params, _req| {
                Ok::<_, Error>(Reply::html("<p>home</p>"))
            })),
        )]
    }
}

fn bootstrap(overrides: serde_json::Value) -> Router {
    let config = ConfigManager::new();
    config.setup(overrides).unwrap();

    let injector = Arc::new(Injector::new());
    config.install(&injector).unwrap();

    let router = Router::new(injector).unwrap();
    router.register_module::<BlogModule>().unwrap();
    router
}

#[tokio::test]
async fn test_blog_application() {
    let router = bootstrap(json!({ "port": 8080 }));
    assert_eq!(router.base_url(), "http://localhost:8080");

    let response = router.respond(HttpRequest::new("GET", "/")).await;
    assert_eq!(response.text(), "<p>home</p>");

    let request = HttpRequest::new("POST", "/posts/")
        .with_header("content-type", "application/x-www-form-urlencoded")
        .with_body("title=Second+post");
    let response = router.respond(request).await;
    assert_eq!(response.status, 201);
    assert_eq!(response.text(), r#"{"id":1}"#);

    let response = router.respond(HttpRequest::new("GET", "/posts/")).await;
    assert_eq!(response.text(), r#"["Hello","Second post"]"#);

    let response = router.respond(HttpRequest::new("GET", "/posts/1")).await;
    assert_eq!(response.text(), "<h1>Second post</h1>");

    let response = router.respond(HttpRequest::new("GET", "/posts/9")).await;
    assert_eq!(response.status, 404);
    assert_eq!(response.text(), "404 - Not Found");
}

#[tokio::test]
async fn test_missing_form_field_is_bad_request() {
    let router = bootstrap(json!({}));

    let request = HttpRequest::new("POST", "/posts/")
        .with_header("content-type", "application/json")
        .with_body(r#"{"body":"no title"}"#);
    let response = router.respond(request).await;
    assert_eq!(response.status, 400);
    assert_eq!(response.text(), "400 - Bad Request");
}

#[tokio::test]
async fn test_method_override_through_form() {
    let router = bootstrap(json!({}));
    router
        .delete("/posts/:id", trellis::handler::sync(|_params, _req| Ok::<_, Error>(())))
        .unwrap();

    let request = HttpRequest::new("POST", "/posts/0")
        .with_header("content-type", "application/x-www-form-urlencoded")
        .with_body("_method=DELETE");
    let response = router.respond(request).await;
    assert_eq!(response.status, 204);
}

#[test]
fn test_logging_to_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("trellis.log");

    let guard = LogConfig::new()
        .level(LogLevel::Info)
        .format(LogFormat::Json)
        .output(LogOutput::File(path.to_string_lossy().into_owned()))
        .init()
        .unwrap();
    trellis::logging::info!(component = "workflow", "logger installed");
    drop(guard);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("logger installed"));
    assert!(contents.contains("\"component\":\"workflow\""));
}
