use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use sekretar_billing::actions::{
    ExtraPlanPaymentRetryAction, ExtraPlanResetAction, KickInactiveAction,
    LegacyRecurrentPaymentRetryAction, RecurrentPaymentAction,
};
use sekretar_billing::collaborators::{BillingBackend, BillingEnv, PaymentGateway, UserNotifier};
use sekretar_billing::types::{
    AdvanceServiceState, ChargeError, ChargeReceipt, PaymentReason, PlanInfo, UserAccount, UserFlag,
};
use sekretar_billing::{
    auto_kick_period, charge_retry_period, kinds, register_billing_actions, sweeps,
    CHARGE_RETRIES_COUNT,
};
use sekretar_database::in_memory::InMemoryStore;
use sekretar_database::interfaces::ActionStoreImpl;
use sekretar_models::core::{ActionFilter, ScheduledAction};
use sekretar_models::errors::SendableError;
use sekretar_scheduler::{Action, ActionRegistry, Scheduler, SchedulerConfig};

#[derive(Default)]
struct MockBackend {
    users: Mutex<HashMap<i64, UserAccount>>,
    next_charge_at: Mutex<Option<DateTime<Utc>>>,
    activations: Mutex<Vec<(i64, i64, Option<i64>)>>,
    extra_activations: Mutex<Vec<(i64, i64, Option<i64>)>>,
    unsubscribed: Mutex<Vec<i64>>,
    flags: Mutex<Vec<(i64, UserFlag, bool)>>,
    advance_states: Mutex<Vec<(i64, AdvanceServiceState)>>,
}

#[async_trait]
impl BillingBackend for MockBackend {
    async fn find_user(&self, user_id: i64) -> Result<Option<UserAccount>, SendableError> {
        Ok(self.users.lock().get(&user_id).cloned())
    }

    async fn extra_plan(&self) -> Result<PlanInfo, SendableError> {
        Ok(extra_plan())
    }

    async fn activate_plan(
        &self,
        user_id: i64,
        plan_id: i64,
        transaction_id: Option<i64>,
    ) -> Result<DateTime<Utc>, SendableError> {
        self.activations
            .lock()
            .push((user_id, plan_id, transaction_id));
        let next = self.next_charge_at.lock();
        Ok(next.unwrap_or_else(|| Utc::now() + Duration::days(30)))
    }

    async fn activate_extra_plan(
        &self,
        user_id: i64,
        plan_id: i64,
        transaction_id: Option<i64>,
    ) -> Result<(), SendableError> {
        self.extra_activations
            .lock()
            .push((user_id, plan_id, transaction_id));
        Ok(())
    }

    async fn unsubscribe(&self, user_id: i64) -> Result<(), SendableError> {
        self.unsubscribed.lock().push(user_id);
        Ok(())
    }

    async fn set_flag(
        &self,
        user_id: i64,
        flag: UserFlag,
        value: bool,
    ) -> Result<(), SendableError> {
        self.flags.lock().push((user_id, flag, value));
        Ok(())
    }

    async fn set_advance_state(
        &self,
        user_id: i64,
        state: AdvanceServiceState,
    ) -> Result<(), SendableError> {
        self.advance_states.lock().push((user_id, state));
        Ok(())
    }
}

struct ScriptedGateway {
    outcomes: Mutex<VecDeque<Result<ChargeReceipt, ChargeError>>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    fn new(outcomes: Vec<Result<ChargeReceipt, ChargeError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn charge(
        &self,
        _user: &UserAccount,
        _plan: &PlanInfo,
        _reason: PaymentReason,
    ) -> Result<ChargeReceipt, ChargeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ChargeError::Gateway("no scripted outcome left".into())))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn record(&self, event: String) -> Result<(), SendableError> {
        self.events.lock().push(event);
        if self.fail {
            return Err("notifier down".into());
        }
        Ok(())
    }
}

#[async_trait]
impl UserNotifier for RecordingNotifier {
    async fn payment_succeeded(
        &self,
        chat_id: &str,
        plan_id: i64,
        price: i64,
    ) -> Result<(), SendableError> {
        self.record(format!("succeeded:{chat_id}:{plan_id}:{price}"))
    }

    async fn payment_failed(
        &self,
        chat_id: &str,
        plan_id: i64,
        price: i64,
        is_extra: bool,
    ) -> Result<(), SendableError> {
        self.record(format!("failed:{chat_id}:{plan_id}:{price}:{is_extra}"))
    }

    async fn user_kicked(
        &self,
        chat_id: &str,
        plan_id: i64,
        has_number: bool,
    ) -> Result<(), SendableError> {
        self.record(format!("kicked:{chat_id}:{plan_id}:{has_number}"))
    }
}

struct Harness {
    store: InMemoryStore,
    scheduler: Scheduler<InMemoryStore>,
    backend: Arc<MockBackend>,
    gateway: Arc<ScriptedGateway>,
    notifier: Arc<RecordingNotifier>,
    env: Arc<BillingEnv>,
}

fn harness(gateway: ScriptedGateway, notifier: RecordingNotifier) -> Harness {
    let store = InMemoryStore::new();
    let backend = Arc::new(MockBackend::default());
    let gateway = Arc::new(gateway);
    let notifier = Arc::new(notifier);
    let env = Arc::new(BillingEnv {
        backend: backend.clone(),
        gateway: gateway.clone(),
        notifier: notifier.clone(),
    });
    let mut registry = ActionRegistry::new();
    register_billing_actions(&mut registry, Arc::clone(&env)).unwrap();
    let scheduler = Scheduler::new(
        Arc::new(store.clone()),
        registry,
        SchedulerConfig::default(),
    );
    Harness {
        store,
        scheduler,
        backend,
        gateway,
        notifier,
        env,
    }
}

fn regular_plan() -> PlanInfo {
    PlanInfo {
        id: 10,
        name: "regular".into(),
        price: 990,
        is_extra: false,
    }
}

fn extra_plan() -> PlanInfo {
    PlanInfo {
        id: 20,
        name: "extra".into(),
        price: 490,
        is_extra: true,
    }
}

fn subscriber(id: i64) -> UserAccount {
    UserAccount {
        id,
        display_name: format!("user-{id}"),
        chat_id: Some(format!("chat-{id}")),
        payment_token: Some("card-token".into()),
        virtual_number: Some("+15550100".into()),
        plan: Some(regular_plan()),
    }
}

async fn pending_of_kind(store: &InMemoryStore, kind: &str) -> Vec<ScheduledAction> {
    store
        .find_pending(&ActionFilter::default())
        .await
        .unwrap()
        .into_iter()
        .filter(|row| row.kind == kind)
        .collect()
}

fn accepted(transaction_id: i64) -> Result<ChargeReceipt, ChargeError> {
    Ok(ChargeReceipt { transaction_id })
}

fn declined() -> Result<ChargeReceipt, ChargeError> {
    Err(ChargeError::Declined("insufficient funds".into()))
}

fn gateway_down() -> Result<ChargeReceipt, ChargeError> {
    Err(ChargeError::Gateway("connect timeout".into()))
}

#[tokio::test]
async fn successful_recurrent_charge_activates_and_reschedules() {
    let h = harness(
        ScriptedGateway::new(vec![accepted(555)]),
        RecordingNotifier::default(),
    );
    h.backend.users.lock().insert(1, subscriber(1));
    let next_charge_at = Utc::now() + Duration::days(31);
    *h.backend.next_charge_at.lock() = Some(next_charge_at);

    let action = RecurrentPaymentAction {
        user_id: 1,
        retries_left: 0,
    };
    action.run(&h.scheduler, &h.env, Utc::now()).await.unwrap();

    assert_eq!(*h.backend.activations.lock(), vec![(1, 10, Some(555))]);
    assert_eq!(
        *h.backend.flags.lock(),
        vec![(1, UserFlag::FailedRecurrentRecovered, true)]
    );

    // Re-scheduled at the new period's end with a fresh retry budget
    let rows = pending_of_kind(&h.store, kinds::RECURRENT_PAYMENT).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].time, next_charge_at);
    assert_eq!(rows[0].args["retries_left"], CHARGE_RETRIES_COUNT);

    assert_eq!(
        *h.notifier.events.lock(),
        vec!["succeeded:chat-1:10:990".to_string()]
    );
}

#[tokio::test]
async fn declined_recurrent_charge_spends_one_retry_per_attempt() {
    let h = harness(
        ScriptedGateway::new(vec![declined(), declined()]),
        RecordingNotifier::default(),
    );
    h.backend.users.lock().insert(1, subscriber(1));

    let due = Utc::now();
    let action = RecurrentPaymentAction {
        user_id: 1,
        retries_left: CHARGE_RETRIES_COUNT,
    };
    action.run(&h.scheduler, &h.env, due).await.unwrap();

    let rows = pending_of_kind(&h.store, kinds::RECURRENT_PAYMENT).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].args["retries_left"], CHARGE_RETRIES_COUNT - 1);
    assert_eq!(rows[0].time, due + charge_retry_period());
    assert_eq!(
        *h.backend.flags.lock(),
        vec![(1, UserFlag::FailedRecurrentRecovered, false)]
    );

    // Decode the persisted retry and fail it again: the budget keeps shrinking
    let retry: RecurrentPaymentAction = serde_json::from_value(rows[0].args.clone()).unwrap();
    h.scheduler.cancel(rows[0].id).await.unwrap();
    let second_due = rows[0].time;
    retry.run(&h.scheduler, &h.env, second_due).await.unwrap();

    let rows = pending_of_kind(&h.store, kinds::RECURRENT_PAYMENT).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].args["retries_left"], CHARGE_RETRIES_COUNT - 2);
    assert_eq!(rows[0].time, second_due + charge_retry_period());

    assert_eq!(h.gateway.calls(), 2);
    assert!(pending_of_kind(&h.store, kinds::KICK_INACTIVE).await.is_empty());
}

#[tokio::test]
async fn exhausted_retry_budget_escalates_to_kick() {
    let h = harness(
        ScriptedGateway::new(vec![declined()]),
        RecordingNotifier::default(),
    );
    h.backend.users.lock().insert(1, subscriber(1));

    let due = Utc::now();
    let action = RecurrentPaymentAction {
        user_id: 1,
        retries_left: 0,
    };
    action.run(&h.scheduler, &h.env, due).await.unwrap();

    assert!(pending_of_kind(&h.store, kinds::RECURRENT_PAYMENT).await.is_empty());
    let kicks = pending_of_kind(&h.store, kinds::KICK_INACTIVE).await;
    assert_eq!(kicks.len(), 1);
    assert_eq!(kicks[0].user_id, Some(1));
    assert_eq!(kicks[0].time, due + auto_kick_period());
}

#[tokio::test]
async fn missing_user_or_plan_is_a_clean_noop() {
    let h = harness(ScriptedGateway::new(vec![]), RecordingNotifier::default());

    let action = RecurrentPaymentAction {
        user_id: 42,
        retries_left: 2,
    };
    action
        .run(&h.scheduler, &h.env, Utc::now())
        .await
        .unwrap();

    let mut unsubscribed = subscriber(43);
    unsubscribed.plan = None;
    h.backend.users.lock().insert(43, unsubscribed);
    let action = RecurrentPaymentAction {
        user_id: 43,
        retries_left: 2,
    };
    action
        .run(&h.scheduler, &h.env, Utc::now())
        .await
        .unwrap();

    assert_eq!(h.gateway.calls(), 0);
    assert!(h
        .store
        .find_pending(&ActionFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn legacy_retry_kind_runs_as_recurrent_payment() {
    let h = harness(
        ScriptedGateway::new(vec![declined()]),
        RecordingNotifier::default(),
    );
    h.backend.users.lock().insert(1, subscriber(1));

    let due = Utc::now();
    let action = LegacyRecurrentPaymentRetryAction {
        user_id: 1,
        retries_left: 1,
    };
    action.run(&h.scheduler, &h.env, due).await.unwrap();

    // The follow-up is persisted under the current kind, not the retired one
    assert!(pending_of_kind(&h.store, kinds::RECURRENT_PAYMENT_RETRY)
        .await
        .is_empty());
    let rows = pending_of_kind(&h.store, kinds::RECURRENT_PAYMENT).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].args["retries_left"], 0);
}

#[tokio::test]
async fn extra_retry_past_deadline_resets_marker_without_charging() {
    let h = harness(ScriptedGateway::new(vec![]), RecordingNotifier::default());
    h.backend.users.lock().insert(7, subscriber(7));

    let action = ExtraPlanPaymentRetryAction {
        user_id: 7,
        retries_left: 2,
        deadline: Utc::now() - Duration::minutes(1),
    };
    action.run(&h.scheduler, &h.env, Utc::now()).await.unwrap();

    assert_eq!(h.gateway.calls(), 0);
    assert_eq!(
        *h.backend.advance_states.lock(),
        vec![(7, AdvanceServiceState::Unused)]
    );
}

#[tokio::test]
async fn successful_extra_retry_activates_extra_plan() {
    let h = harness(
        ScriptedGateway::new(vec![accepted(777)]),
        RecordingNotifier::default(),
    );
    h.backend.users.lock().insert(7, subscriber(7));

    let action = ExtraPlanPaymentRetryAction {
        user_id: 7,
        retries_left: 1,
        deadline: Utc::now() + Duration::days(3),
    };
    action.run(&h.scheduler, &h.env, Utc::now()).await.unwrap();

    assert_eq!(*h.backend.extra_activations.lock(), vec![(7, 20, Some(777))]);
    assert_eq!(
        *h.backend.flags.lock(),
        vec![(7, UserFlag::FailedExtraRecovered, true)]
    );
    assert!(h
        .store
        .find_pending(&ActionFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        *h.notifier.events.lock(),
        vec!["succeeded:chat-7:20:490".to_string()]
    );
}

#[tokio::test]
async fn failed_extra_retry_keeps_deadline_and_stops_at_zero_budget() {
    let h = harness(
        ScriptedGateway::new(vec![declined(), declined()]),
        RecordingNotifier::default(),
    );
    h.backend.users.lock().insert(7, subscriber(7));

    let due = Utc::now();
    let deadline = due + Duration::days(3);
    let action = ExtraPlanPaymentRetryAction {
        user_id: 7,
        retries_left: 1,
        deadline,
    };
    action.run(&h.scheduler, &h.env, due).await.unwrap();

    let rows = pending_of_kind(&h.store, kinds::EXTRA_PLAN_PAYMENT_RETRY).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].args["retries_left"], 0);
    assert_eq!(rows[0].time, due + charge_retry_period());

    let retry: ExtraPlanPaymentRetryAction = serde_json::from_value(rows[0].args.clone()).unwrap();
    assert_eq!(retry.deadline, deadline);
    h.scheduler.cancel(rows[0].id).await.unwrap();

    // Zero retries left: the failure is final, nothing is re-scheduled
    retry.run(&h.scheduler, &h.env, rows[0].time).await.unwrap();
    assert!(h
        .store
        .find_pending(&ActionFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn extra_plan_reset_clears_advance_marker() {
    let h = harness(ScriptedGateway::new(vec![]), RecordingNotifier::default());
    h.backend.users.lock().insert(7, subscriber(7));

    let action = ExtraPlanResetAction { user_id: 7 };
    action.run(&h.scheduler, &h.env, Utc::now()).await.unwrap();

    assert_eq!(
        *h.backend.advance_states.lock(),
        vec![(7, AdvanceServiceState::Unused)]
    );
}

#[tokio::test(start_paused = true)]
async fn kick_unsubscribes_notifies_and_sweeps_pending_billing() {
    let h = harness(ScriptedGateway::new(vec![]), RecordingNotifier::default());
    h.backend.users.lock().insert(1, subscriber(1));

    let later = Utc::now() + Duration::days(2);
    h.scheduler
        .schedule(
            &RecurrentPaymentAction {
                user_id: 1,
                retries_left: 2,
            },
            later,
        )
        .await
        .unwrap();
    h.scheduler
        .schedule(
            &ExtraPlanPaymentRetryAction {
                user_id: 1,
                retries_left: 1,
                deadline: later,
            },
            later,
        )
        .await
        .unwrap();
    let bystander = h
        .scheduler
        .schedule(
            &RecurrentPaymentAction {
                user_id: 2,
                retries_left: 2,
            },
            later,
        )
        .await
        .unwrap();

    let action = KickInactiveAction { user_id: 1 };
    action.run(&h.scheduler, &h.env, Utc::now()).await.unwrap();

    assert_eq!(*h.backend.unsubscribed.lock(), vec![1]);
    assert_eq!(
        *h.notifier.events.lock(),
        vec!["kicked:chat-1:10:true".to_string()]
    );

    // The sweep runs only after the grace delay has elapsed
    assert_eq!(
        h.store
            .find_pending(&ActionFilter::for_user(1))
            .await
            .unwrap()
            .len(),
        2
    );
    tokio::time::sleep(std::time::Duration::from_secs(11)).await;

    assert!(h
        .store
        .find_pending(&ActionFilter::for_user(1))
        .await
        .unwrap()
        .is_empty());
    assert!(!bystander.is_done().await.unwrap());
}

#[tokio::test]
async fn extra_punishment_sweep_cancels_retry_and_reset_only() {
    let h = harness(ScriptedGateway::new(vec![]), RecordingNotifier::default());
    let later = Utc::now() + Duration::days(1);

    h.scheduler
        .schedule(
            &ExtraPlanPaymentRetryAction {
                user_id: 7,
                retries_left: 1,
                deadline: later,
            },
            later,
        )
        .await
        .unwrap();
    h.scheduler
        .schedule(&ExtraPlanResetAction { user_id: 7 }, later)
        .await
        .unwrap();
    let recurrent = h
        .scheduler
        .schedule(
            &RecurrentPaymentAction {
                user_id: 7,
                retries_left: 2,
            },
            later,
        )
        .await
        .unwrap();

    let cancelled = sweeps::cancel_extra_punishments(&h.scheduler, 7).await.unwrap();
    assert_eq!(cancelled, 2);
    assert!(!recurrent.is_done().await.unwrap());
}

#[tokio::test]
async fn punishment_sweep_leaves_the_base_subscription_charge() {
    let h = harness(ScriptedGateway::new(vec![]), RecordingNotifier::default());
    let later = Utc::now() + Duration::days(1);

    h.scheduler
        .schedule(&KickInactiveAction { user_id: 7 }, later)
        .await
        .unwrap();
    h.scheduler
        .schedule(
            &LegacyRecurrentPaymentRetryAction {
                user_id: 7,
                retries_left: 1,
            },
            later,
        )
        .await
        .unwrap();
    h.scheduler
        .schedule(
            &ExtraPlanPaymentRetryAction {
                user_id: 7,
                retries_left: 1,
                deadline: later,
            },
            later,
        )
        .await
        .unwrap();
    let recurrent = h
        .scheduler
        .schedule(
            &RecurrentPaymentAction {
                user_id: 7,
                retries_left: 2,
            },
            later,
        )
        .await
        .unwrap();

    let cancelled = sweeps::cancel_billing_punishment(&h.scheduler, 7).await.unwrap();
    assert_eq!(cancelled, 3);
    assert!(!recurrent.is_done().await.unwrap());
}

#[tokio::test]
async fn gateway_outage_does_not_spend_the_retry_budget() {
    let h = harness(
        ScriptedGateway::new(vec![gateway_down()]),
        RecordingNotifier::default(),
    );
    h.backend.users.lock().insert(1, subscriber(1));

    let action = RecurrentPaymentAction {
        user_id: 1,
        retries_left: CHARGE_RETRIES_COUNT,
    };
    let result = action.run(&h.scheduler, &h.env, Utc::now()).await;
    assert!(result.is_err());

    // No reschedule, no kick, no marker write: the failure surfaces to the
    // execution wrapper and the action refires with its budget intact
    assert!(h
        .store
        .find_pending(&ActionFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert!(h.backend.flags.lock().is_empty());
    assert!(h.notifier.events.lock().is_empty());
}

#[tokio::test]
async fn gateway_outage_on_extra_retry_leaves_budget_intact() {
    let h = harness(
        ScriptedGateway::new(vec![gateway_down()]),
        RecordingNotifier::default(),
    );
    h.backend.users.lock().insert(7, subscriber(7));

    let action = ExtraPlanPaymentRetryAction {
        user_id: 7,
        retries_left: 1,
        deadline: Utc::now() + Duration::days(3),
    };
    assert!(action.run(&h.scheduler, &h.env, Utc::now()).await.is_err());

    assert!(h
        .store
        .find_pending(&ActionFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert!(h.backend.flags.lock().is_empty());
}

#[tokio::test]
async fn swept_reset_never_fires_or_touches_the_marker() {
    let h = harness(ScriptedGateway::new(vec![]), RecordingNotifier::default());
    h.backend.users.lock().insert(7, subscriber(7));

    let handle = h
        .scheduler
        .schedule(
            &ExtraPlanResetAction { user_id: 7 },
            Utc::now() + Duration::milliseconds(200),
        )
        .await
        .unwrap();

    let cancelled = sweeps::cancel_extra_punishments(&h.scheduler, 7).await.unwrap();
    assert_eq!(cancelled, 1);

    // Well past the original due time: the cancelled action must not run
    tokio::time::sleep(std::time::Duration::from_millis(600)).await;

    assert!(h.backend.advance_states.lock().is_empty());
    assert!(handle.is_done().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn recurrent_charge_recovers_after_two_declines_through_the_scheduler() {
    let h = harness(
        ScriptedGateway::new(vec![declined(), declined(), accepted(9)]),
        RecordingNotifier::default(),
    );
    h.backend.users.lock().insert(3, subscriber(3));
    let next_charge_at = Utc::now() + Duration::days(60);
    *h.backend.next_charge_at.lock() = Some(next_charge_at);

    h.scheduler
        .schedule(
            &RecurrentPaymentAction {
                user_id: 3,
                retries_left: CHARGE_RETRIES_COUNT,
            },
            Utc::now(),
        )
        .await
        .unwrap();

    // Two declines reschedule a day apart each; the third fire succeeds
    tokio::time::sleep(std::time::Duration::from_secs(4 * 86_400)).await;

    assert_eq!(h.gateway.calls(), 3);
    assert_eq!(
        *h.backend.flags.lock(),
        vec![
            (3, UserFlag::FailedRecurrentRecovered, false),
            (3, UserFlag::FailedRecurrentRecovered, false),
            (3, UserFlag::FailedRecurrentRecovered, true),
        ]
    );
    assert_eq!(*h.backend.activations.lock(), vec![(3, 10, Some(9))]);

    // The surviving row is the next period's charge with a fresh budget
    let rows = pending_of_kind(&h.store, kinds::RECURRENT_PAYMENT).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].time, next_charge_at);
    assert_eq!(rows[0].args["retries_left"], CHARGE_RETRIES_COUNT);
    assert!(pending_of_kind(&h.store, kinds::KICK_INACTIVE).await.is_empty());
}

#[tokio::test]
async fn notifier_failure_never_fails_the_charge() {
    let h = harness(
        ScriptedGateway::new(vec![accepted(1)]),
        RecordingNotifier::failing(),
    );
    h.backend.users.lock().insert(1, subscriber(1));

    let action = RecurrentPaymentAction {
        user_id: 1,
        retries_left: 0,
    };
    action.run(&h.scheduler, &h.env, Utc::now()).await.unwrap();

    assert_eq!(h.backend.activations.lock().len(), 1);
    assert_eq!(h.notifier.events.lock().len(), 1);
}
