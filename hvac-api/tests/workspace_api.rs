//! Workspace, membership and invitation endpoints.

use rocket::http::{Cookie, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use hvac_api::orm::testing::{
    MEMBER, OTHER_WORKSPACE, OUTSIDER, OWNER, PLATFORM_ADMIN, TEST_WORKSPACE, WORKSPACE_ADMIN,
    test_rocket,
};

async fn login(client: &Client, account: (&str, &str)) -> Cookie<'static> {
    let response = client
        .post("/api/1/login")
        .json(&json!({"email": account.0, "password": account.1}))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok, "login as {}", account.0);
    response
        .cookies()
        .get("session")
        .expect("Session cookie should be set")
        .clone()
        .into_owned()
}

/// Looks a workspace up by name through the platform admin's listing.
async fn workspace_id(client: &Client, name: &str) -> i32 {
    let admin = login(client, PLATFORM_ADMIN).await;
    let response = client.get("/api/1/Workspaces").cookie(admin).dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let workspaces: Value = response.into_json().await.unwrap();
    workspaces
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["name"] == name)
        .and_then(|w| w["id"].as_i64())
        .expect("seeded workspace") as i32
}

async fn user_id(client: &Client, cookie: &Cookie<'static>) -> i64 {
    let response = client.get("/api/1/hello").cookie(cookie.clone()).dispatch().await;
    let body: Value = response.into_json().await.unwrap();
    body["user_id"].as_i64().unwrap()
}

#[rocket::async_test]
async fn test_create_workspace_makes_caller_owner() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let member = login(&client, MEMBER).await;

    let response = client
        .post("/api/1/Workspaces")
        .cookie(member.clone())
        .json(&json!({"name": "Member's Lab"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let created: Value = response.into_json().await.unwrap();
    assert_eq!(created["name"], "Member's Lab");
    assert!(created["created_at"].is_string());

    let id = created["id"].as_i64().unwrap();
    let response = client
        .get(format!("/api/1/Workspaces/{}/Members", id))
        .cookie(member.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let members: Value = response.into_json().await.unwrap();
    assert_eq!(members.as_array().unwrap().len(), 1);
    assert_eq!(members[0]["email"], MEMBER.0);
    assert_eq!(members[0]["role"], "owner");

    let response = client.get("/api/1/Workspaces").cookie(member).dispatch().await;
    let listed: Value = response.into_json().await.unwrap();
    let names: Vec<&str> = listed.as_array().unwrap().iter().filter_map(|w| w["name"].as_str()).collect();
    assert!(names.contains(&TEST_WORKSPACE));
    assert!(names.contains(&"Member's Lab"));
    assert!(!names.contains(&OTHER_WORKSPACE));
}

#[rocket::async_test]
async fn test_create_workspace_rejects_blank_name() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let owner = login(&client, OWNER).await;

    let response = client
        .post("/api/1/Workspaces")
        .cookie(owner)
        .json(&json!({"name": "   "}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["error"], "Workspace name must not be empty");
}

#[rocket::async_test]
async fn test_non_member_gets_not_found_for_workspace() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let acme = workspace_id(&client, TEST_WORKSPACE).await;
    let outsider = login(&client, OUTSIDER).await;

    let response = client
        .get(format!("/api/1/Workspaces/{}", acme))
        .cookie(outsider.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    // Workspace-scoped collections answer 403 instead
    let response = client
        .get(format!("/api/1/Workspaces/{}/Members", acme))
        .cookie(outsider)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);
}

#[rocket::async_test]
async fn test_only_owner_renames_and_deletes() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let acme = workspace_id(&client, TEST_WORKSPACE).await;
    let admin = login(&client, WORKSPACE_ADMIN).await;
    let owner = login(&client, OWNER).await;

    let response = client
        .put(format!("/api/1/Workspaces/{}", acme))
        .cookie(admin.clone())
        .json(&json!({"name": "Hijacked"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .delete(format!("/api/1/Workspaces/{}", acme))
        .cookie(admin)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .put(format!("/api/1/Workspaces/{}", acme))
        .cookie(owner.clone())
        .json(&json!({"name": "Acme Headquarters"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let renamed: Value = response.into_json().await.unwrap();
    assert_eq!(renamed["name"], "Acme Headquarters");

    let response = client
        .delete(format!("/api/1/Workspaces/{}", acme))
        .cookie(owner.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NoContent);

    let response = client
        .get(format!("/api/1/Workspaces/{}", acme))
        .cookie(owner)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_platform_admin_sees_every_workspace() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let globex = workspace_id(&client, OTHER_WORKSPACE).await;
    let admin = login(&client, PLATFORM_ADMIN).await;

    let response = client
        .get(format!("/api/1/Workspaces/{}", globex))
        .cookie(admin)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let body: Value = response.into_json().await.unwrap();
    assert_eq!(body["name"], OTHER_WORKSPACE);
}

#[rocket::async_test]
async fn test_owner_cannot_be_removed() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let acme = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;
    let admin = login(&client, WORKSPACE_ADMIN).await;
    let owner_id = user_id(&client, &owner).await;

    let response = client
        .delete(format!("/api/1/Workspaces/{}/Members/{}", acme, owner_id))
        .cookie(admin)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);
}

#[rocket::async_test]
async fn test_member_management() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let acme = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;
    let admin = login(&client, WORKSPACE_ADMIN).await;
    let member = login(&client, MEMBER).await;
    let admin_id = user_id(&client, &admin).await;
    let member_id = user_id(&client, &member).await;

    // Plain members cannot remove others
    let response = client
        .delete(format!("/api/1/Workspaces/{}/Members/{}", acme, admin_id))
        .cookie(member.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // but may leave on their own
    let response = client
        .delete(format!("/api/1/Workspaces/{}/Members/{}", acme, member_id))
        .cookie(member.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NoContent);

    let response = client
        .get(format!("/api/1/Workspaces/{}", acme))
        .cookie(member)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    // Removing someone who is not a member
    let response = client
        .delete(format!("/api/1/Workspaces/{}/Members/{}", acme, member_id))
        .cookie(owner)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_invitation_flow() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let acme = workspace_id(&client, TEST_WORKSPACE).await;
    let admin = login(&client, WORKSPACE_ADMIN).await;
    let outsider = login(&client, OUTSIDER).await;
    let member = login(&client, MEMBER).await;

    // Members cannot invite
    let response = client
        .post(format!("/api/1/Workspaces/{}/Invitations", acme))
        .cookie(member.clone())
        .json(&json!({"email": OUTSIDER.0}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // Ownership cannot be handed out by invitation
    let response = client
        .post(format!("/api/1/Workspaces/{}/Invitations", acme))
        .cookie(admin.clone())
        .json(&json!({"email": OUTSIDER.0, "role": "owner"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .post(format!("/api/1/Workspaces/{}/Invitations", acme))
        .cookie(admin.clone())
        .json(&json!({"email": "not-an-email"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);

    let response = client
        .post(format!("/api/1/Workspaces/{}/Invitations", acme))
        .cookie(admin.clone())
        .json(&json!({"email": OUTSIDER.0}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let invitation: Value = response.into_json().await.unwrap();
    assert_eq!(invitation["role"], "member");
    assert_eq!(invitation["accepted"], false);
    let token = invitation["token"].as_str().unwrap().to_string();

    let response = client
        .get(format!("/api/1/Workspaces/{}/Invitations", acme))
        .cookie(admin)
        .dispatch()
        .await;
    let pending: Value = response.into_json().await.unwrap();
    assert_eq!(pending.as_array().unwrap().len(), 1);

    // Someone else cannot use the token
    let response = client
        .post(format!("/api/1/Invitations/{}/accept", token))
        .cookie(member)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .post(format!("/api/1/Invitations/{}/accept", token))
        .cookie(outsider.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let membership: Value = response.into_json().await.unwrap();
    assert_eq!(membership["workspace_id"], acme);
    assert_eq!(membership["role"], "member");

    let response = client
        .get(format!("/api/1/Workspaces/{}", acme))
        .cookie(outsider.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .post(format!("/api/1/Invitations/{}/accept", token))
        .cookie(outsider.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Conflict);

    let response = client
        .post("/api/1/Invitations/no-such-token/accept")
        .cookie(outsider)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}
