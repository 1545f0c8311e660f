use super::*;
use crate::session::OperationHandle;
use std::collections::BTreeMap;
use std::path::PathBuf;
use warden_core::message::{parse_command, ChatInfo, MessageBody};

const OWNER: i64 = 100;

fn gate() -> Gatekeeper {
    let defaults = SessionDefaults::new(
        vec!["bash".into()],
        PathBuf::from("/home/owner"),
        BTreeMap::new(),
    );
    Gatekeeper::new(OWNER, defaults)
}

fn event_in(chat: ChatInfo, sender: i64, text: &str) -> IncomingMessage {
    let (command, args) = match parse_command(text, None) {
        Some((c, a)) => (Some(c), a),
        None => (None, None),
    };
    IncomingMessage {
        id: uuid::Uuid::new_v4(),
        channel: "telegram".to_string(),
        message_id: 1,
        chat,
        sender_id: sender,
        sender_name: None,
        text: text.to_string(),
        command,
        args,
        timestamp: chrono::Utc::now(),
        queued: false,
        edited: false,
    }
}

fn private(id: i64, name: &str) -> ChatInfo {
    ChatInfo {
        id,
        name: name.to_string(),
        username: None,
        is_private: true,
    }
}

fn group(id: i64, title: &str) -> ChatInfo {
    ChatInfo {
        id,
        name: title.to_string(),
        username: None,
        is_private: false,
    }
}

/// Event in a private chat, where chat id == sender id.
fn event(chat: i64, text: &str) -> IncomingMessage {
    event_in(private(chat, "someone"), chat, text)
}

fn key_of(res: &Resolution) -> Option<i64> {
    res.access().map(|a| a.context_key)
}

// --- Rule 1: owner ---

#[test]
fn test_owner_always_authorized() {
    let gate = gate();
    for text in ["/srvstatus", "hello", "/start", "/anything at all"] {
        let res = gate.resolve(&event(OWNER, text));
        let access = res.access().expect("owner must be authorized");
        assert_eq!(access.context_key, OWNER);
        assert_eq!(access.path, AccessPath::Owner);
        assert!(res.outbox.is_empty());
    }
}

#[test]
fn test_owner_authorized_regardless_of_grants() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    gate.revoke(OWNER, Some("200")).unwrap();
    assert!(gate.resolve(&event(OWNER, "/help")).is_authorized());
}

// --- Rule 5: rejection ---

#[test]
fn test_unknown_chat_start_gets_notice() {
    let gate = gate();
    let res = gate.resolve(&event(300, "/start"));
    assert!(!res.is_authorized());
    assert_eq!(res.outbox.len(), 1);
    assert_eq!(res.outbox[0].target, 300);
    assert_eq!(
        res.outbox[0].body,
        MessageBody::Text("Not authorized to use this bot.".into())
    );
}

#[test]
fn test_unknown_chat_other_input_is_silent() {
    let gate = gate();
    for text in ["/srvstatus", "/grant 300", "ls -la", "/token"] {
        let res = gate.resolve(&event(300, text));
        assert!(!res.is_authorized());
        assert!(res.outbox.is_empty(), "no reply expected for {text:?}");
    }
}

#[test]
fn test_custom_deny_message() {
    let gate = gate().with_deny_message("Nope.");
    let res = gate.resolve(&event(300, "/start"));
    assert_eq!(res.outbox[0].body, MessageBody::Text("Nope.".into()));
}

#[test]
fn test_rejection_creates_no_session() {
    let gate = gate();
    gate.resolve(&event(300, "/start"));
    assert!(gate.session(300).is_none());
}

// --- Rule 2: grants ---

#[test]
fn test_grant_then_event_gets_fresh_context() {
    let gate = gate();
    assert_eq!(
        gate.grant(OWNER, Some("200")),
        Ok((200, GrantOutcome::Granted))
    );

    let res = gate.resolve(&event(200, "/whatever"));
    let access = res.access().unwrap();
    assert_eq!(access.context_key, 200);
    assert_eq!(access.path, AccessPath::Granted);

    let ctx = access.session.snapshot();
    assert_eq!(ctx.key, 200);
    assert_eq!(ctx.shell, "bash");
    assert_eq!(ctx.cwd, PathBuf::from("/home/owner"));
    assert!(ctx.silent);
    assert!(!ctx.is_busy());
}

#[test]
fn test_grant_is_idempotent() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    assert_eq!(
        gate.grant(OWNER, Some("200")),
        Ok((200, GrantOutcome::AlreadyGranted))
    );
    assert_eq!(gate.granted(OWNER).unwrap(), vec![200]);
}

#[test]
fn test_grant_owner_stores_nothing() {
    let gate = gate();
    assert_eq!(
        gate.grant(OWNER, Some("100")),
        Ok((OWNER, GrantOutcome::Owner))
    );
    assert!(gate.granted(OWNER).unwrap().is_empty());
}

#[test]
fn test_grant_requires_owner_context() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    assert_eq!(gate.grant(200, Some("300")), Err(AuthError::Unauthorized));
    assert!(!gate.is_granted(300));
}

#[test]
fn test_grant_rejects_malformed_id() {
    let gate = gate();
    assert_eq!(
        gate.grant(OWNER, None),
        Err(AuthError::InvalidArgument(None))
    );
    assert!(matches!(
        gate.grant(OWNER, Some("alice")),
        Err(AuthError::InvalidArgument(Some(_)))
    ));
    assert!(gate.granted(OWNER).unwrap().is_empty());
}

#[test]
fn test_grant_revoke_grant_ends_granted() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    gate.revoke(OWNER, Some("200")).unwrap();
    gate.grant(OWNER, Some("200")).unwrap();
    assert!(gate.is_granted(200));
    assert!(gate.resolve(&event(200, "/help")).is_authorized());
}

// --- Revocation ---

#[test]
fn test_revoke_blocked_while_command_running() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    let session = gate.resolve(&event(200, "/help")).access().unwrap().session.clone();
    session.lock().command = Some(OperationHandle::new("sleep 100"));

    assert_eq!(
        gate.revoke(OWNER, Some("200")),
        Err(AuthError::OperationInProgress(200))
    );
    assert!(gate.is_granted(200));
    assert!(gate.session(200).unwrap().same_as(&session));

    session.lock().command = None;
    assert_eq!(
        gate.revoke(OWNER, Some("200")),
        Ok((200, RevokeOutcome::Revoked))
    );
    assert!(gate.session(200).is_none());
    assert!(!gate.resolve(&event(200, "/help")).is_authorized());
}

#[test]
fn test_revoke_blocked_while_editing() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    let res = gate.resolve(&event(200, "/help"));
    res.access().unwrap().session.lock().editor = Some(OperationHandle::new("notes.txt"));

    assert_eq!(
        gate.revoke(OWNER, Some("200")),
        Err(AuthError::OperationInProgress(200))
    );
}

#[test]
fn test_revoke_without_grant_is_noop() {
    let gate = gate();
    assert_eq!(
        gate.revoke(OWNER, Some("200")),
        Ok((200, RevokeOutcome::NotGranted))
    );
}

#[test]
fn test_revoke_owner_refused() {
    let gate = gate();
    let owner_session = gate.resolve(&event(OWNER, "/help")).access().unwrap().session.clone();
    assert_eq!(
        gate.revoke(OWNER, Some("100")),
        Err(AuthError::OwnerUnrevokable)
    );
    assert!(gate.session(OWNER).unwrap().same_as(&owner_session));
}

#[test]
fn test_revoke_requires_owner_context() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    assert_eq!(gate.revoke(200, Some("200")), Err(AuthError::Unauthorized));
    assert!(gate.is_granted(200));
}

#[test]
fn test_revoke_gives_fresh_context_after_regrant() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    let first = gate.resolve(&event(200, "/help")).access().unwrap().session.clone();
    first.lock().silent = false;

    gate.revoke(OWNER, Some("200")).unwrap();
    gate.grant(OWNER, Some("200")).unwrap();
    let second = gate.resolve(&event(200, "/help")).access().unwrap().session.clone();
    assert!(!second.same_as(&first));
    assert!(second.lock().silent);
}

// --- Rule 3: tokens ---

#[test]
fn test_token_redemption_scenario() {
    let gate = gate();
    let token = gate.issue_token(OWNER).unwrap();

    let mut chat = private(200, "Alice <admin>");
    chat.username = Some("alice".to_string());
    let msg = event_in(chat, 200, &format!("/start {token}"));

    let res = gate.resolve(&msg);
    let access = res.access().expect("token should authorize");
    assert_eq!(access.context_key, 200);
    assert_eq!(access.path, AccessPath::Redeemed);
    assert!(gate.is_granted(200));
    assert!(!gate.is_outstanding(&token));

    assert_eq!(res.outbox.len(), 2);
    assert!(res.outbox.iter().all(|m| m.target == OWNER));
    assert_eq!(
        res.outbox[0].body,
        MessageBody::Html(
            "User <em>Alice &lt;admin&gt;</em> (@alice) can now use the bot. To revoke, use:"
                .into()
        )
    );
    assert_eq!(res.outbox[1].text_content(), "/revoke 200");

    // Same event again: authorized through the grant, no second notification.
    let again = gate.resolve(&msg);
    assert_eq!(again.access().unwrap().path, AccessPath::Granted);
    assert!(again.outbox.is_empty());
}

#[test]
fn test_token_is_single_use_across_chats() {
    let gate = gate();
    let token = gate.issue_token(OWNER).unwrap();
    let start = format!("/start {token}");

    assert!(gate.resolve(&event(200, &start)).is_authorized());

    let replay = gate.resolve(&event(300, &start));
    assert!(!replay.is_authorized());
    assert_eq!(replay.outbox.len(), 1, "only the generic notice");
    assert_eq!(replay.outbox[0].target, 300);
    assert!(!gate.is_granted(300));
}

#[test]
fn test_group_redemption_notice_says_chat() {
    let gate = gate();
    let token = gate.issue_token(OWNER).unwrap();
    let msg = event_in(group(-5001, "Ops"), 42, &format!("/start {token}"));

    let res = gate.resolve(&msg);
    assert_eq!(res.access().unwrap().context_key, -5001);
    assert_eq!(
        res.outbox[0].text_content(),
        "Chat <em>Ops</em> can now use the bot. To revoke, use:"
    );
    assert_eq!(res.outbox[1].text_content(), "/revoke -5001");
}

#[test]
fn test_unredeemed_token_stays_valid() {
    let gate = gate();
    let token = gate.issue_token(OWNER).unwrap();
    for _ in 0..3 {
        gate.resolve(&event(300, "/start wrong"));
        gate.resolve(&event(300, "/help"));
    }
    assert!(gate.granted(OWNER).unwrap().is_empty());
    assert!(gate.is_outstanding(&token));
    assert!(gate.resolve(&event(300, &format!("/start {token}"))).is_authorized());
}

#[test]
fn test_token_needs_exact_match_and_start_command() {
    let gate = gate();
    let token = gate.issue_token(OWNER).unwrap();

    assert!(!gate.resolve(&event(300, &format!("/help {token}"))).is_authorized());
    assert!(!gate
        .resolve(&event(300, &format!("/start {token} extra")))
        .is_authorized());
    assert!(!gate
        .resolve(&event(300, &format!("/start {}", &token[1..])))
        .is_authorized());
    assert!(gate.is_outstanding(&token));
}

#[test]
fn test_token_issue_requires_owner_context() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    assert_eq!(gate.issue_token(200), Err(AuthError::Unauthorized));
    assert_eq!(gate.outstanding_tokens(), 0);
}

#[test]
fn test_owner_start_with_token_does_not_consume() {
    let gate = gate();
    let token = gate.issue_token(OWNER).unwrap();
    let res = gate.resolve(&event(OWNER, &format!("/start {token}")));
    assert_eq!(res.access().unwrap().path, AccessPath::Owner);
    assert!(res.outbox.is_empty());
    assert!(gate.is_outstanding(&token));

    assert_eq!(gate.withdraw_token(OWNER, &token), Ok(true));
    assert_eq!(gate.withdraw_token(OWNER, &token), Ok(false));
}

#[test]
fn test_withdraw_requires_owner() {
    let gate = gate();
    let token = gate.issue_token(OWNER).unwrap();
    assert_eq!(gate.withdraw_token(200, &token), Err(AuthError::Unauthorized));
    assert!(gate.is_outstanding(&token));
}

// --- Rule 4: sender fallback ---

#[test]
fn test_owner_in_foreign_group_uses_personal_context() {
    let gate = gate();
    let owner_session = gate.resolve(&event(OWNER, "/help")).access().unwrap().session.clone();

    let res = gate.resolve(&event_in(group(-7000, "Friends"), OWNER, "/srvstatus"));
    let access = res.access().unwrap();
    assert_eq!(access.context_key, OWNER);
    assert_eq!(access.path, AccessPath::Sender);
    assert!(access.session.same_as(&owner_session));
    assert!(gate.session(-7000).is_none());
}

#[test]
fn test_granted_user_in_foreign_group_uses_own_context() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    let res = gate.resolve(&event_in(group(-7000, "Friends"), 200, "/srvstatus"));
    assert_eq!(key_of(&res), Some(200));
    assert!(gate.is_owner_key(OWNER));
    assert!(!gate.is_owner_key(200));
}

#[test]
fn test_granted_group_takes_precedence_over_sender() {
    let gate = gate();
    gate.grant(OWNER, Some("-7000")).unwrap();
    let res = gate.resolve(&event_in(group(-7000, "Team"), OWNER, "/token"));
    let access = res.access().unwrap();
    assert_eq!(access.context_key, -7000);
    assert_eq!(access.path, AccessPath::Granted);
    // Acting through the group's context, the owner may not mint tokens.
    assert_eq!(gate.issue_token(access.context_key), Err(AuthError::Unauthorized));
}

#[test]
fn test_unknown_sender_in_unknown_group_rejected() {
    let gate = gate();
    let res = gate.resolve(&event_in(group(-7000, "Friends"), 555, "/srvstatus"));
    assert_eq!(key_of(&res), None);
    assert!(res.outbox.is_empty());
}

// --- Listing ---

#[test]
fn test_granted_list_only_for_owner_chat() {
    let gate = gate();
    gate.grant(OWNER, Some("300")).unwrap();
    gate.grant(OWNER, Some("200")).unwrap();
    assert_eq!(gate.granted(OWNER).unwrap(), vec![200, 300]);
    assert_eq!(gate.granted(-7000), Err(AuthError::Unauthorized));
}

// --- Sessions through the gate ---

#[test]
fn test_sessions_are_independent_per_chat() {
    let gate = gate();
    gate.grant(OWNER, Some("200")).unwrap();
    let a = gate.resolve(&event(OWNER, "/help")).access().unwrap().session.clone();
    let b = gate.resolve(&event(200, "/help")).access().unwrap().session.clone();

    a.lock().cwd = PathBuf::from("/var/log");
    assert_eq!(b.lock().cwd, PathBuf::from("/home/owner"));

    let a_again = gate.resolve(&event(OWNER, "/help")).access().unwrap().session.clone();
    assert!(a_again.same_as(&a));
    assert_eq!(a_again.lock().cwd, PathBuf::from("/var/log"));
}

#[test]
fn test_available_shells_from_defaults() {
    assert_eq!(gate().available_shells(), vec!["bash".to_string()]);
}

// --- Concurrency ---

#[test]
fn test_concurrent_redemption_has_one_winner() {
    for _ in 0..20 {
        let gate = std::sync::Arc::new(gate());
        let token = gate.issue_token(OWNER).unwrap();
        let barrier = std::sync::Arc::new(std::sync::Barrier::new(16));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let gate = gate.clone();
                let barrier = barrier.clone();
                let text = format!("/start {token}");
                std::thread::spawn(move || {
                    barrier.wait();
                    gate.resolve(&event(1000 + i, &text)).is_authorized()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(gate.granted(OWNER).unwrap().len(), 1);
        assert!(!gate.is_outstanding(&token));
        assert_eq!(gate.outstanding_tokens(), 0);
    }
}
