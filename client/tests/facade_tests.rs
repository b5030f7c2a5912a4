use std::sync::Arc;

use shiptrack_client::{ClientError, CreatePayload, LedgerClient, LocalEngine, TransitionPayload};
use shiptrack_ledger::{LedgerError, TransitionError};
use shiptrack_nullables::{NullBalanceStore, NullClock, NullProbe, NullProvider, NullShipmentStore};
use shiptrack_session::{Negotiator, SessionError};
use shiptrack_store::BalanceStore;
use shiptrack_types::{AccountId, Amount, ShipmentStatus, Timestamp};

fn alice() -> AccountId {
    AccountId::from_bytes([0xa1; 20])
}

fn bob() -> AccountId {
    AccountId::from_bytes([0xb0; 20])
}

fn price() -> Amount {
    Amount::parse_decimal("1.5").unwrap()
}

struct Harness {
    client: LedgerClient,
    provider: Arc<NullProvider>,
    balances: Arc<NullBalanceStore>,
}

fn harness(provider: NullProvider) -> Harness {
    let provider = Arc::new(provider);
    let balances = Arc::new(NullBalanceStore::new());
    let engine = LocalEngine::new(
        Arc::new(NullShipmentStore::new()),
        Arc::clone(&balances),
        Arc::new(NullClock::new(1_000)),
    )
    .unwrap();
    let negotiator = Negotiator::new(Arc::new(NullProbe::injected(provider.clone())));
    Harness {
        client: LedgerClient::new(Arc::new(negotiator), Arc::new(engine)),
        provider,
        balances,
    }
}

fn to_bob(value: Option<Amount>) -> CreatePayload {
    CreatePayload {
        receiver: bob(),
        pickup_time: Timestamp::new(500),
        distance: 120,
        price: price(),
        value,
    }
}

fn transition(index: u64) -> TransitionPayload {
    TransitionPayload {
        receiver: bob(),
        index,
    }
}

#[tokio::test]
async fn full_lifecycle_pays_the_completing_account() {
    let h = harness(NullProvider::authorized(vec![alice()]));

    let receipt = h.client.create(to_bob(None)).await.unwrap();
    assert_eq!((receipt.id, receipt.index), (0, 0));
    assert_eq!(receipt.status, ShipmentStatus::Pending);
    assert_eq!(h.client.my_count().await.unwrap(), 1);

    let pending = h.client.read(0).await.unwrap().unwrap();
    assert_eq!(pending.receiver, bob());
    assert_eq!(pending.pickup_time, Timestamp::new(500));
    assert_eq!(pending.distance, 120);
    assert_eq!(pending.price, price());
    assert!(pending.delivery_time.is_unset());

    h.client.start(transition(0)).await.unwrap();
    let before = h.balances.balance_of(&alice()).unwrap();
    let receipt = h.client.complete(transition(0)).await.unwrap();
    assert_eq!(receipt.status, ShipmentStatus::Delivered);
    assert_eq!(receipt.events.len(), 2);

    let after = h.client.balance_of(&alice()).await.unwrap();
    assert_eq!(after, before + price());

    let delivered = h.client.read(0).await.unwrap().unwrap();
    assert_eq!(delivered.status, ShipmentStatus::Delivered);
    assert!(delivered.is_paid);
    assert_eq!(delivered.delivery_time, Timestamp::new(1_000));
}

#[tokio::test]
async fn payment_mismatch_creates_nothing() {
    let h = harness(NullProvider::authorized(vec![alice()]));

    let err = h.client.create(to_bob(Some(Amount::ONE))).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Ledger(LedgerError::PaymentMismatch { price: p, attached }) if p == price() && attached == Amount::ONE
    ));
    assert_eq!(h.client.count(&alice()).await.unwrap(), 0);
    assert!(h.client.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn transition_errors_pass_through_unchanged() {
    let h = harness(NullProvider::authorized(vec![alice()]));

    assert!(matches!(
        h.client.start(transition(0)).await,
        Err(ClientError::Ledger(LedgerError::NotFound { .. }))
    ));

    h.client.create(to_bob(None)).await.unwrap();
    assert!(matches!(
        h.client.complete(transition(0)).await,
        Err(ClientError::Ledger(LedgerError::InvalidTransition(TransitionError::NotInTransit)))
    ));

    h.client.start(transition(0)).await.unwrap();
    assert!(matches!(
        h.client.start(transition(0)).await,
        Err(ClientError::Ledger(LedgerError::InvalidTransition(TransitionError::AlreadyInTransit)))
    ));

    h.client.complete(transition(0)).await.unwrap();
    assert!(matches!(
        h.client.complete(transition(0)).await,
        Err(ClientError::Ledger(LedgerError::InvalidTransition(TransitionError::AlreadyPaid)))
    ));
}

#[tokio::test]
async fn wrong_receiver_is_rejected() {
    let h = harness(NullProvider::authorized(vec![alice()]));
    h.client.create(to_bob(None)).await.unwrap();

    let err = h
        .client
        .start(TransitionPayload {
            receiver: alice(),
            index: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Ledger(LedgerError::InvalidReceiver { .. })));
}

#[tokio::test]
async fn refused_payout_can_be_retried() {
    let h = harness(NullProvider::authorized(vec![alice()]));
    h.client.create(to_bob(None)).await.unwrap();
    h.client.start(transition(0)).await.unwrap();

    h.balances.refuse(&alice());
    let err = h.client.complete(transition(0)).await.unwrap_err();
    assert!(matches!(&err, ClientError::Ledger(e) if e.is_retryable()));
    let shipment = h.client.read(0).await.unwrap().unwrap();
    assert_eq!(shipment.status, ShipmentStatus::InTransit);
    assert!(!shipment.is_paid);

    h.balances.accept(&alice());
    h.client.complete(transition(0)).await.unwrap();
    assert_eq!(h.client.balance_of(&alice()).await.unwrap(), price());
}

#[tokio::test]
async fn rejected_prompt_is_session_denied() {
    let h = harness(NullProvider::rejecting());

    let err = h.client.create(to_bob(None)).await.unwrap_err();
    assert!(matches!(err, ClientError::Session(SessionError::SessionDenied(_))));
    assert_eq!(h.client.list_all().await.unwrap().len(), 0);
}

#[tokio::test]
async fn reads_without_an_account_never_prompt() {
    let h = harness(NullProvider::locked(vec![alice()]));

    assert_eq!(h.client.read(0).await.unwrap(), None);
    assert_eq!(h.client.my_count().await.unwrap(), 0);
    assert!(h.client.list_all().await.unwrap().is_empty());
    assert_eq!(h.client.current_account().await, None);
    assert_eq!(h.provider.prompt_count(), 0);
}

#[tokio::test]
async fn reads_with_no_provider_at_all() {
    let engine = LocalEngine::new(
        Arc::new(NullShipmentStore::new()),
        Arc::new(NullBalanceStore::new()),
        Arc::new(NullClock::new(1)),
    )
    .unwrap();
    let client = LedgerClient::new(Arc::new(Negotiator::new(Arc::new(NullProbe::empty()))), Arc::new(engine));

    assert_eq!(client.read(3).await.unwrap(), None);
    assert_eq!(client.my_count().await.unwrap(), 0);
    assert!(matches!(
        client.create(to_bob(None)).await,
        Err(ClientError::Session(SessionError::SessionUnavailable(_)))
    ));
}

#[tokio::test]
async fn read_out_of_range_is_not_found() {
    let h = harness(NullProvider::authorized(vec![alice()]));
    h.client.create(to_bob(None)).await.unwrap();

    assert!(matches!(
        h.client.read(1).await,
        Err(ClientError::Ledger(LedgerError::NotFound { index: 1, .. }))
    ));
}

#[tokio::test]
async fn list_all_spans_senders_in_creation_order() {
    let h = harness(NullProvider::authorized(vec![alice()]));
    h.client.create(to_bob(None)).await.unwrap();

    h.provider.set_prompt(Ok(vec![bob()]));
    assert_eq!(h.client.switch_account().await, Some(bob()));
    h.client.create(to_bob(None)).await.unwrap();

    let all = h.client.list_all().await.unwrap();
    let senders: Vec<_> = all.iter().map(|s| s.sender.clone()).collect();
    assert_eq!(senders, vec![alice(), bob()]);
    assert_eq!(h.client.count(&alice()).await.unwrap(), 1);
    assert_eq!(h.client.count(&bob()).await.unwrap(), 1);
}

#[tokio::test]
async fn disconnect_hides_the_account_until_reconnect() {
    let h = harness(NullProvider::authorized(vec![alice()]));
    h.client.create(to_bob(None)).await.unwrap();
    assert_eq!(h.client.my_count().await.unwrap(), 1);

    h.client.disconnect();
    assert_eq!(h.client.current_account().await, None);
    assert_eq!(h.client.read(0).await.unwrap(), None);
    assert_eq!(h.client.my_count().await.unwrap(), 0);

    assert_eq!(h.client.connect().await, Some(alice()));
    assert_eq!(h.client.my_count().await.unwrap(), 1);
}
