use std::sync::Arc;

use trellis_core::handler::sync;
use trellis_core::prelude::*;
use trellis_core::{PathPattern, RouteDescriptor, RouteStore};

fn router() -> Router {
    Router::new(Arc::new(Injector::new())).unwrap()
}

#[test]
fn test_optional_trailing_parameter() {
    let pattern = PathPattern::parse("/users/:id?").unwrap();

    let params = pattern.matches("/users/").unwrap();
    assert_eq!(params.get("id"), None);
    assert_eq!(params.len(), 1);

    let params = pattern.matches("/users/42").unwrap();
    assert_eq!(params.get("id"), Some("42"));

    assert!(pattern.matches("/users/42/posts").is_none());
    assert!(pattern.matches("/accounts/42").is_none());
}

#[test]
fn test_first_registered_route_wins() {
    let store = RouteStore::new();
    let action = |body: &'static str| Action::new(sync(move |_params, _req| Ok::<_, Error>(body)));

    store.push(
        RouteDescriptor::new(
            "/items/:id",
            vec![HttpMethod::GET],
            action("by id"),
            RouteOptions::default(),
        )
        .unwrap(),
    );
    store.push(
        RouteDescriptor::new(
            "/items/new",
            vec![HttpMethod::GET],
            action("new form"),
            RouteOptions::default(),
        )
        .unwrap(),
    );

    let (route, params) = store.find(HttpMethod::GET, "/items/new").unwrap();
    assert_eq!(route.path, "/items/:id");
    assert_eq!(params.get("id"), Some("new"));
}

#[test]
fn test_method_must_be_allowed() {
    let store = RouteStore::new();
    store.push(
        RouteDescriptor::new(
            "/items",
            vec![HttpMethod::GET, HttpMethod::HEAD],
            Action::new(sync(|_params, _req| Ok::<_, Error>(()))),
            RouteOptions::default(),
        )
        .unwrap(),
    );

    assert!(store.find(HttpMethod::HEAD, "/items").is_some());
    assert!(store.find(HttpMethod::POST, "/items").is_none());
}

#[tokio::test]
async fn test_params_reach_the_action() {
    let router = router();
    router
        .get("/posts/:post/comments/:comment", |params: RouteParams, _req: Arc<HttpRequest>| async move {
            Ok::<_, Error>(format!(
                "{}:{}",
                params.get("post").unwrap_or("-"),
                params.get("comment").unwrap_or("-")
            ))
        })
        .unwrap();

    let response = router
        .respond(HttpRequest::new("GET", "/posts/7/comments/12?sort=asc"))
        .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.text(), "7:12");
}

struct UserStore {
    names: Vec<&'static str>,
}

impl Injectable for UserStore {
    fn construct(_: &mut Dependencies) -> Result<Self, Error> {
        Ok(UserStore {
            names: vec!["ada", "grace"],
        })
    }
}

struct UsersController {
    store: Arc<UserStore>,
}

impl Injectable for UsersController {
    fn construct(deps: &mut Dependencies) -> Result<Self, Error> {
        Ok(UsersController {
            store: deps.next()?,
        })
    }
}

impl Controller for UsersController {
    fn methods() -> Vec<ControllerMethod<Self>> {
        vec![
            ControllerMethod::action("index", |this: Arc<Self>, _params, _req| async move {
                Ok::<_, Error>(this.store.names.join(","))
            }),
            ControllerMethod::action("show", |this: Arc<Self>, params: RouteParams, _req| async move {
                let Some(id) = params.get("id") else {
                    return Ok::<_, Error>("all users".to_string());
                };
                let index: usize = id.parse().map_err(|_| Error::bad_request("invalid id"))?;
                this.store
                    .names
                    .get(index)
                    .map(|name| name.to_string())
                    .ok_or_else(|| Error::not_found(format!("no user {}", index)))
            }),
            ControllerMethod::action("_audit", |_this, _params, _req| async {
                Ok::<_, Error>("audit")
            }),
            ControllerMethod::action("password", |_this, _params, _req| async {
                Ok::<_, Error>("hunter2")
            })
            .private(),
            ControllerMethod::action("build", |_this, _params, _req| async { Ok::<_, Error>(()) })
                .as_static(),
            ControllerMethod::error_handler("missing", |_this, status: HttpStatus| async move {
                Ok::<_, Error>(format!("users: {}", status.reason()))
            }),
        ]
    }

    fn declare(d: &Decorators) -> Result<(), Error> {
        d.controller::<Self>("/users");
        d.inject::<Self>([ClassRef::of::<UserStore>()]);
        d.get.route("/list")?.apply(d.method::<Self>("index")?)?;
        d.get.route("/:id?")?.apply(d.method::<Self>("show")?)?;
        d.get.route("/audit/log")?.apply(d.method::<Self>("_audit")?)?;
        d.error(Some(HttpStatus::NotFound))
            .apply(d.method::<Self>("missing")?)?;
        Ok(())
    }
}

#[tokio::test]
async fn test_controller_registration() {
    let router = router();
    router.register_controller::<UsersController>().unwrap();

    let paths: Vec<String> = router.store().routes().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/users/list", "/users/:id?"]);

    let response = router.respond(HttpRequest::new("GET", "/users/list")).await;
    assert_eq!(response.text(), "ada,grace");

    let response = router.respond(HttpRequest::new("GET", "/users/")).await;
    assert_eq!(response.text(), "all users");

    let response = router.respond(HttpRequest::new("GET", "/users/1")).await;
    assert_eq!(response.text(), "grace");

    let response = router.respond(HttpRequest::new("GET", "/users/audit/log")).await;
    assert_eq!(response.status, 404);
    assert_eq!(response.text(), "users: Not Found");

    let response = router.respond(HttpRequest::new("GET", "/users/abc")).await;
    assert_eq!(response.status, 400);
}

#[test]
fn test_controller_declared_once() {
    let injector = Arc::new(Injector::new());
    let router = Router::new(injector.clone()).unwrap();

    router.register_controller::<UsersController>().unwrap();
    router.register_controller::<UsersController>().unwrap();

    assert_eq!(router.store().len(), 4);
    assert_eq!(
        injector.get::<UsersController>().unwrap().store.names.len(),
        2
    );
}

#[test]
fn test_route_decorator_rejects_private_and_static_methods() {
    let router = router();
    let d = router.decorators();

    let private = d.method::<UsersController>("password").unwrap();
    let err = d.post.route("/password").unwrap().apply(private).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid decorator usage: Controller route method \"password\" must be public"
    );

    let static_method = d.method::<UsersController>("build").unwrap();
    let err = d.put.route("/build").unwrap().apply(static_method).unwrap_err();
    assert!(err.to_string().contains("cannot be static"));

    assert!(d.method::<UsersController>("missing_method").is_err());
}

#[test]
fn test_route_decorator_validates_path() {
    let router = router();
    let decorator = router.create_route_decorator(&[HttpMethod::GET]);

    assert!(decorator.route("/ok/:id").is_ok());
    assert!(decorator.route("/bad/:id?/tail").is_err());
    assert!(router.create_methods_decorator().route(&[], "/empty").is_err());
}

struct BrokenController;

impl Injectable for BrokenController {
    fn construct(_: &mut Dependencies) -> Result<Self, Error> {
        Ok(BrokenController)
    }
}

impl Controller for BrokenController {
    fn methods() -> Vec<ControllerMethod<Self>> {
        vec![
            ControllerMethod::action("hidden", |_this, _params, _req| async { Ok::<_, Error>(()) })
                .private(),
        ]
    }

    fn declare(d: &Decorators) -> Result<(), Error> {
        d.get.route("/hidden")?.apply(d.method::<Self>("hidden")?)?;
        Ok(())
    }
}

#[test]
fn test_failed_declaration_aborts_registration() {
    let router = router();
    let err = router.register_controller::<BrokenController>().unwrap_err();

    assert!(matches!(err, Error::Decorator(_)));
    assert!(router.store().is_empty());
}
