mod common;

use std::sync::Arc;

use tokio::net::TcpListener;
use url::Url;

use zaki::client::notice;
use zaki::client::{
    AccountBackend, AuthContext, AuthMode, FlowOutcome, MemoryStore, PromptReason,
    QuestionLimits, SubmissionFlow, SubmitReply, ZakiClient,
};
use zaki::identity::IdentityProvider;
use zaki::quota::{QuotaStatus, Remaining, default_policy};
use zaki::router::zaki_router;
use zaki::ZakiError;

use common::{PASSWORD, test_state};

async fn spawn_server() -> Url {
    let app = zaki_router(test_state().await);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });
    Url::parse(&format!("http://{addr}/")).expect("base url")
}

#[tokio::test]
async fn visitor_signs_up_asks_and_signs_out() {
    let base = spawn_server().await;
    let client = Arc::new(ZakiClient::new(base).expect("client"));
    let mut ctx = AuthContext::attach(client.clone()).await.expect("attach");
    assert!(!ctx.is_authenticated());

    let mut flow = SubmissionFlow::new(QuestionLimits::new(
        default_policy(),
        client.clone(),
        MemoryStore::new(),
    ));

    for _ in 0..3 {
        flow.set_draft("ما هي عاصمة مصر؟");
        assert!(matches!(
            flow.submit(ctx.user().as_ref()).await,
            FlowOutcome::Accepted { .. }
        ));
    }
    flow.set_draft("و عاصمة المغرب؟");
    assert_eq!(
        flow.submit(ctx.user().as_ref()).await,
        FlowOutcome::Prompted(PromptReason::LimitReached)
    );

    let dialog = flow.dialog_mut().expect("prompt open");
    assert_eq!(dialog.mode(), AuthMode::SignUp);
    dialog.email = "visitor@example.com".to_string();
    dialog.password = PASSWORD.to_string();
    assert_eq!(dialog.submit(client.as_ref()).await.message, notice::SIGNED_UP);
    assert_eq!(dialog.mode(), AuthMode::SignIn);

    dialog.password = PASSWORD.to_string();
    assert_eq!(dialog.submit(client.as_ref()).await.message, notice::SIGNED_IN);
    assert!(!dialog.is_open());
    flow.dismiss_prompt();

    assert!(ctx.changed().await);
    let user = ctx.user().expect("signed in");
    assert_eq!(user.email, "visitor@example.com");

    for asked in 1..=3u32 {
        flow.set_draft(format!("سؤال {asked}"));
        assert_eq!(
            flow.submit(Some(&user)).await,
            FlowOutcome::Accepted {
                remaining: Remaining::Limited(3 - asked)
            }
        );
    }
    flow.set_draft("one more");
    assert_eq!(
        flow.submit(Some(&user)).await,
        FlowOutcome::Prompted(PromptReason::LimitReached)
    );

    // the server refuses on its own too
    assert_eq!(
        client.submit_question("bypassing the client").await.expect("reply"),
        SubmitReply::LimitReached(QuotaStatus::free(3))
    );
    assert_eq!(client.load_quota().await.expect("quota"), QuotaStatus::free(3));

    let n = zaki::client::dialog::sign_out(client.as_ref()).await;
    assert_eq!(n.message, notice::SIGNED_OUT);
    assert!(ctx.changed().await);
    assert!(!ctx.is_authenticated());
    assert!(ctx.provider().get_session().await.expect("session lookup").is_none());
    assert!(matches!(
        client.load_quota().await,
        Err(ZakiError::Unauthorized)
    ));
}

#[tokio::test]
async fn client_surfaces_auth_errors() {
    let base = spawn_server().await;
    let client = ZakiClient::new(base).expect("client");

    client
        .sign_up("dup@example.com", PASSWORD)
        .await
        .expect("first sign-up");
    assert!(matches!(
        client.sign_up("dup@example.com", PASSWORD).await,
        Err(ZakiError::EmailTaken)
    ));
    assert!(matches!(
        client.sign_in("dup@example.com", "wrong-password").await,
        Err(ZakiError::InvalidCredentials)
    ));
    client
        .reset_password("nobody@example.com")
        .await
        .expect("reset is accepted for unknown emails");
}
