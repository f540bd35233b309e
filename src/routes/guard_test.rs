use super::*;
use crate::state::test_helpers::test_app_state;

// =============================================================================
// matching
// =============================================================================

#[test]
fn is_under_respects_segment_boundaries() {
    assert!(is_under("/dashboard/income", "/dashboard/income"));
    assert!(is_under("/dashboard/income/", "/dashboard/income"));
    assert!(is_under("/dashboard/income/new", "/dashboard/income"));
    assert!(!is_under("/dashboard/incomex", "/dashboard/income"));
    assert!(!is_under("/dashboardx", "/dashboard"));
}

#[test]
fn classify_paths() {
    assert_eq!(classify("/auth/login"), PathClass::AuthOnly);
    assert_eq!(classify("/auth/register/"), PathClass::AuthOnly);
    assert_eq!(classify("/auth/logout"), PathClass::Public);
    assert_eq!(classify("/dashboard"), PathClass::Page);
    assert_eq!(classify("/dashboard/students"), PathClass::Page);
    assert_eq!(classify("/api/students/1"), PathClass::Api);
    assert_eq!(classify("/apiary"), PathClass::Public);
    assert_eq!(classify("/"), PathClass::Public);
    assert_eq!(classify("/healthz"), PathClass::Public);
}

#[test]
fn section_is_first_segment_below_prefix() {
    assert_eq!(section("/dashboard"), Some("dashboard"));
    assert_eq!(section("/dashboard/"), Some("dashboard"));
    assert_eq!(section("/dashboard/income/42"), Some("income"));
    assert_eq!(section("/api/expenses/1/status"), Some("expenses"));
    assert_eq!(section("/api/dashboard/summary"), Some("dashboard"));
    assert_eq!(section("/api"), None);
}

#[test]
fn role_table_matches_sections() {
    assert_eq!(allowed_roles("settings"), Some(&[Role::Admin][..]));
    assert_eq!(allowed_roles("income"), Some(&[Role::Admin, Role::Treasurer][..]));
    assert_eq!(allowed_roles("dashboard").map(<[Role]>::len), Some(5));
    assert!(!allowed_roles("students").is_some_and(|r| r.contains(&Role::Parent)));
    assert_eq!(allowed_roles("help"), None);
}

#[test]
fn safe_redirects_stay_local() {
    assert!(is_safe_redirect("/dashboard/income"));
    assert!(!is_safe_redirect("//evil.example/x"));
    assert!(!is_safe_redirect("https://evil.example"));
    assert!(!is_safe_redirect("/\\evil.example"));
    assert!(!is_safe_redirect(""));
    assert!(!is_safe_redirect("/\t/evil.example"));
    assert!(!is_safe_redirect("/\n/evil.example"));
    assert!(!is_safe_redirect("/dashboard\r\nSet-Cookie: x=1"));
}

#[test]
fn redirect_param_is_decoded() {
    assert_eq!(redirect_param(Some("a=1&redirect=%2Fdashboard%2Fincome")), Some("/dashboard/income".into()));
    assert_eq!(redirect_param(Some("a=1")), None);
    assert_eq!(redirect_param(None), None);
}

// =============================================================================
// decide
// =============================================================================

#[test]
fn encoded_control_characters_do_not_escape_the_site() {
    assert_eq!(
        decide("/auth/login", Some("redirect=%2F%09%2Fevil.example"), Some(Role::Admin)),
        GuardDecision::Redirect(HOME_PATH.to_owned())
    );
    assert_eq!(
        decide("/auth/login", Some("redirect=%2F%0A%2Fevil.example"), Some(Role::Admin)),
        GuardDecision::Redirect(HOME_PATH.to_owned())
    );
}

#[test]
fn signed_out_page_request_goes_to_login_with_target() {
    assert_eq!(
        decide("/dashboard/income", Some("page=2"), None),
        GuardDecision::Login { redirect: "/dashboard/income?page=2".into() }
    );
    assert_eq!(login_url("/dashboard/income?page=2"), "/auth/login?redirect=%2Fdashboard%2Fincome%3Fpage%3D2");
}

#[test]
fn signed_out_api_request_is_unauthorized() {
    assert_eq!(decide("/api/students", None, None), GuardDecision::Unauthorized);
}

#[test]
fn public_and_auth_pages_open_when_signed_out() {
    assert_eq!(decide("/", None, None), GuardDecision::Continue);
    assert_eq!(decide("/auth/login", None, None), GuardDecision::Continue);
    assert_eq!(decide("/healthz", None, Some(Role::Parent)), GuardDecision::Continue);
}

#[test]
fn signed_in_user_leaves_auth_pages() {
    assert_eq!(
        decide("/auth/login", Some("redirect=%2Fdashboard%2Freports"), Some(Role::Principal)),
        GuardDecision::Redirect("/dashboard/reports".into())
    );
    assert_eq!(
        decide("/auth/login", Some("redirect=%2F%2Fevil.example"), Some(Role::Principal)),
        GuardDecision::Redirect(HOME_PATH.into())
    );
    assert_eq!(decide("/auth/register", None, Some(Role::Parent)), GuardDecision::Redirect(HOME_PATH.into()));
}

#[test]
fn role_failures_redirect_pages_and_forbid_api() {
    assert_eq!(
        decide("/dashboard/income", None, Some(Role::Teacher)),
        GuardDecision::Redirect(HOME_PATH.into())
    );
    assert_eq!(decide("/api/income", None, Some(Role::Teacher)), GuardDecision::Forbidden);
}

#[test]
fn whitelisted_roles_continue() {
    assert_eq!(decide("/dashboard/income", None, Some(Role::Treasurer)), GuardDecision::Continue);
    assert_eq!(decide("/dashboard/settings", None, Some(Role::Admin)), GuardDecision::Continue);
    assert_eq!(decide("/dashboard", None, Some(Role::Parent)), GuardDecision::Continue);
    assert_eq!(decide("/api/dashboard/summary", None, Some(Role::Parent)), GuardDecision::Continue);
}

#[test]
fn every_role_is_checked_against_every_section() {
    for (name, roles) in SECTION_ROLES {
        for role in Role::ALL {
            let path = format!("/api/{name}");
            let expected = if roles.contains(&role) { GuardDecision::Continue } else { GuardDecision::Forbidden };
            assert_eq!(decide(&path, None, Some(role)), expected, "{role} on {path}");
        }
    }
}

#[test]
fn unknown_sections_only_need_a_session() {
    assert_eq!(decide("/dashboard/help", None, Some(Role::Parent)), GuardDecision::Continue);
    assert_eq!(
        decide("/dashboard/help", None, None),
        GuardDecision::Login { redirect: "/dashboard/help".into() }
    );
}

#[test]
fn lookalike_prefix_is_not_protected() {
    assert_eq!(decide("/dashboardx", None, None), GuardDecision::Continue);
}

// =============================================================================
// middleware over HTTP
// =============================================================================

async fn spawn_app() -> String {
    let app = crate::routes::app(test_app_state());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn http_page_without_session_redirects_to_login() {
    let base = spawn_app().await;
    let res = client().get(format!("{base}/dashboard/income?page=2")).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::FOUND);
    assert_eq!(
        res.headers().get("location").and_then(|v| v.to_str().ok()),
        Some("/auth/login?redirect=%2Fdashboard%2Fincome%3Fpage%3D2")
    );
}

#[tokio::test]
async fn http_api_without_session_is_401_json() {
    let base = spawn_app().await;
    let res = client().get(format!("{base}/api/students")).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body.get("error").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn http_public_routes_pass_through() {
    let base = spawn_app().await;
    let health = client().get(format!("{base}/healthz")).send().await.unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);

    let login = client().get(format!("{base}/auth/login")).send().await.unwrap();
    assert_eq!(login.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = login.json().await.unwrap();
    assert_eq!(body.get("redirect").and_then(|v| v.as_str()), Some(HOME_PATH));
}

#[tokio::test]
async fn http_session_lookup_failure_is_503_on_protected_paths() {
    let base = spawn_app().await;
    let res = client()
        .get(format!("{base}/api/students"))
        .header("cookie", format!("{SESSION_COOKIE}=deadbeef"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn http_me_without_session_is_401() {
    let base = spawn_app().await;
    let res = client().get(format!("{base}/auth/me")).send().await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::UNAUTHORIZED);
}
