use authbridge_auth::error::AuthError;
use authbridge_auth::services::oauth::{OAuth2Service, ProviderEndpoints};
use authbridge_config::{Oauth2Config, ProviderCredentials};
use authbridge_models::OAuth2Provider;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_credentials(name: &str) -> ProviderCredentials {
    ProviderCredentials {
        client_id: format!("{name}-client-id"),
        client_secret: format!("{name}-client-secret"),
    }
}

fn test_config() -> Oauth2Config {
    Oauth2Config {
        redirect_url: "https://app.example.com/oauth2/callback".to_string(),
        facebook: test_credentials("facebook"),
        google: test_credentials("google"),
        linkedin: test_credentials("linkedin"),
    }
}

fn endpoints_for(server: &MockServer) -> ProviderEndpoints {
    let base = server.uri();
    ProviderEndpoints {
        facebook_token_url: format!("{base}/facebook/oauth/access_token"),
        facebook_profile_url: format!("{base}/facebook/me"),
        google_token_url: format!("{base}/google/token"),
        google_profile_url: format!("{base}/google/userinfo"),
        linkedin_token_url: format!("{base}/linkedin/accessToken"),
        linkedin_profile_url: format!("{base}/linkedin/me"),
        linkedin_email_url: format!("{base}/linkedin/emailAddress"),
    }
}

#[tokio::test]
async fn facebook_code_resolves_to_registration_data() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/facebook/oauth/access_token"))
        .and(query_param("client_id", "facebook-client-id"))
        .and(query_param("code", "fb-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fb-access-token"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/facebook/me"))
        .and(query_param("fields", "id,first_name,last_name,email"))
        .and(query_param("access_token", "fb-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "fb-subject-7",
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": "grace@example.com"
        })))
        .mount(&server)
        .await;

    let service = OAuth2Service::with_endpoints(test_config(), endpoints_for(&server));
    let data = service
        .fetch_registration_data(OAuth2Provider::Facebook, "fb-code")
        .await
        .unwrap();

    assert_eq!(data.first_name, "Grace");
    assert_eq!(data.last_name, "Hopper");
    assert_eq!(data.email, "grace@example.com");
    assert_eq!(data.provider_user_id.as_deref(), Some("fb-subject-7"));
    assert_eq!(data.birth_date, None);
}

#[tokio::test]
async fn google_code_resolves_to_registration_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/google/token"))
        .and(body_partial_json(json!({
            "code": "g-code",
            "grant_type": "authorization_code"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "g-access-token"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/google/userinfo"))
        .and(query_param("alt", "json"))
        .and(query_param("access_token", "g-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "g-subject-1",
            "given_name": "Alan",
            "family_name": "Turing",
            "email": "alan@example.com"
        })))
        .mount(&server)
        .await;

    let service = OAuth2Service::with_endpoints(test_config(), endpoints_for(&server));
    let data = service
        .fetch_registration_data(OAuth2Provider::Google, "g-code")
        .await
        .unwrap();

    assert_eq!(data.first_name, "Alan");
    assert_eq!(data.last_name, "Turing");
    assert_eq!(data.email, "alan@example.com");
    assert_eq!(data.provider_user_id.as_deref(), Some("g-subject-1"));
}

#[tokio::test]
async fn linkedin_merges_profile_and_email_endpoints() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/linkedin/accessToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "li-access-token"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/linkedin/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "li-subject-3",
            "localizedFirstName": "Margaret",
            "localizedLastName": "Hamilton"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/linkedin/emailAddress"))
        .and(query_param("q", "members"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "elements": [
                { "handle~": { "emailAddress": "margaret@example.com" } }
            ]
        })))
        .mount(&server)
        .await;

    let service = OAuth2Service::with_endpoints(test_config(), endpoints_for(&server));
    let data = service
        .fetch_registration_data(OAuth2Provider::LinkedIn, "li-code")
        .await
        .unwrap();

    assert_eq!(data.first_name, "Margaret");
    assert_eq!(data.last_name, "Hamilton");
    assert_eq!(data.email, "margaret@example.com");
    assert_eq!(data.provider_user_id.as_deref(), Some("li-subject-3"));
}

#[tokio::test]
async fn provider_rejecting_the_code_surfaces_a_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/facebook/oauth/access_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Invalid verification code format." }
        })))
        .mount(&server)
        .await;

    let service = OAuth2Service::with_endpoints(test_config(), endpoints_for(&server));
    let result = service
        .fetch_registration_data(OAuth2Provider::Facebook, "bad-code")
        .await;

    assert!(matches!(result, Err(AuthError::Internal(_))));
}

#[tokio::test]
async fn linkedin_without_email_element_is_a_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/linkedin/accessToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "li-access-token"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/linkedin/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "li-subject-3",
            "localizedFirstName": "Margaret",
            "localizedLastName": "Hamilton"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/linkedin/emailAddress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "elements": [] })))
        .mount(&server)
        .await;

    let service = OAuth2Service::with_endpoints(test_config(), endpoints_for(&server));
    let result = service
        .fetch_registration_data(OAuth2Provider::LinkedIn, "li-code")
        .await;

    assert!(matches!(result, Err(AuthError::Internal(_))));
}
