//! The single task that owns a manager session

use super::resolution::{self, needs_approval, Plan};
use super::selection::{aggregate_failure, select_provider, status_for};
use super::state::{ExpressManagerState, ExpressProviderUpdateSource, ExpressStatus};
use super::ManagerConfig;
use crate::fee::FeeResolver;
use express_error::{ExpressError, Result};
use express_provider::ProviderPool;
use express_resilience::with_timeout;
use express_traits::{
    Amount, ExchangeDataRequest, ExpressApprovePolicy, ExpressAvailableProvider, ExpressFeeOption,
    ExpressManagerSwappingPair, ExpressProviderType, ExpressTransactionData,
};
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

pub(crate) enum Command {
    UpdatePair {
        pair: ExpressManagerSwappingPair,
        reply: Reply<ExpressManagerState>,
    },
    UpdateAmount {
        amount: Option<Amount>,
        source: ExpressProviderUpdateSource,
        reply: Reply<ExpressManagerState>,
    },
    UpdateApprovePolicy {
        policy: ExpressApprovePolicy,
        reply: Reply<ExpressManagerState>,
    },
    UpdateFeeOption {
        option: ExpressFeeOption,
        reply: Reply<ExpressManagerState>,
    },
    UpdateSelectedProvider {
        provider_id: String,
        reply: Reply<ExpressManagerState>,
    },
    Refresh {
        source: ExpressProviderUpdateSource,
        reply: Reply<ExpressManagerState>,
    },
    RequestData {
        reply: Reply<ExpressTransactionData>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

impl Command {
    fn reject(self, error: ExpressError) {
        match self {
            Command::UpdatePair { reply, .. }
            | Command::UpdateAmount { reply, .. }
            | Command::UpdateApprovePolicy { reply, .. }
            | Command::UpdateFeeOption { reply, .. }
            | Command::UpdateSelectedProvider { reply, .. }
            | Command::Refresh { reply, .. } => {
                let _ = reply.send(Err(error));
            }
            Command::RequestData { reply } => {
                let _ = reply.send(Err(error));
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

enum TaskResult {
    Resolved {
        generation: u64,
        providers: Vec<ExpressAvailableProvider>,
    },
    Exchange {
        ticket: u64,
        result: Result<ExpressTransactionData>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Work {
    Quotes,
    Approvals,
}

struct Resolution {
    work: Work,
    task: JoinHandle<()>,
    reply: Reply<ExpressManagerState>,
}

struct Exchange {
    ticket: u64,
    task: JoinHandle<()>,
    reply: Reply<ExpressTransactionData>,
}

pub(crate) struct Actor {
    pool: Arc<ProviderPool>,
    fees: FeeResolver,
    config: ManagerConfig,
    state: ExpressManagerState,
    publisher: watch::Sender<ExpressManagerState>,
    commands: mpsc::Receiver<Command>,
    results_tx: mpsc::UnboundedSender<TaskResult>,
    results: mpsc::UnboundedReceiver<TaskResult>,
    generation: u64,
    resolution: Option<Resolution>,
    exchange: Option<Exchange>,
    ticket: u64,
    /// Selection carried across a cleared snapshot, tried first at the next commit
    preferred: Option<String>,
}

impl Actor {
    pub(crate) fn new(
        pool: Arc<ProviderPool>,
        fees: FeeResolver,
        config: ManagerConfig,
        publisher: watch::Sender<ExpressManagerState>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        let (results_tx, results) = mpsc::unbounded_channel();
        Self {
            pool,
            fees,
            config,
            state: ExpressManagerState::default(),
            publisher,
            commands,
            results_tx,
            results,
            generation: 0,
            resolution: None,
            exchange: None,
            ticket: 0,
            preferred: None,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(providers = self.pool.len(), "express manager started");
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if self.handle(command).is_break() {
                            break;
                        }
                    }
                    None => {
                        self.close();
                        break;
                    }
                },
                Some(result) = self.results.recv() => self.finish(result),
            }
        }
        info!("express manager closed");
    }

    fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::UpdatePair { pair, reply } => {
                debug!(pair = %pair, "pair changed");
                self.supersede_exchange();
                self.state.pair = Some(pair);
                self.clear_providers();
                self.state.update_source = Some(ExpressProviderUpdateSource::PairChange);
                self.resolve(reply);
            }
            Command::UpdateAmount {
                amount,
                source,
                reply,
            } => {
                debug!(amount = ?amount, source = %source, "amount changed");
                self.supersede_exchange();
                self.state.amount = amount;
                self.clear_providers();
                self.state.update_source = Some(source);
                self.resolve(reply);
            }
            Command::UpdateApprovePolicy { policy, reply } => self.update_approve_policy(policy, reply),
            Command::UpdateFeeOption { option, reply } => {
                self.state.fee_option = option;
                self.state.update_source = Some(ExpressProviderUpdateSource::FeeOptionChange);
                if let ExpressStatus::Ready(ready) = &mut self.state.status {
                    ready.selected_fee = *ready.fee.fee(option);
                }
                self.publish();
                let _ = reply.send(Ok(self.state.clone()));
            }
            Command::UpdateSelectedProvider { provider_id, reply } => {
                self.update_selected_provider(provider_id, reply)
            }
            Command::Refresh { source, reply } => {
                debug!(source = %source, "refresh requested");
                self.supersede_exchange();
                self.state.update_source = Some(source);
                self.resolve(reply);
            }
            Command::RequestData { reply } => self.request_data(reply),
            Command::Shutdown { reply } => {
                self.close();
                let _ = reply.send(Ok(()));
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Drops the resolved set; the selection survives only as a candidate
    fn clear_providers(&mut self) {
        self.state.providers.clear();
        if let Some(provider) = self.state.selected_provider.take() {
            self.preferred = Some(provider.id);
        }
    }

    fn update_approve_policy(&mut self, policy: ExpressApprovePolicy, reply: Reply<ExpressManagerState>) {
        debug!(policy = ?policy, "approve policy changed");
        self.state.update_source = Some(ExpressProviderUpdateSource::ApprovePolicyChange);
        if self.state.approve_policy == policy {
            let _ = reply.send(Ok(self.state.clone()));
            return;
        }
        self.supersede_exchange();
        self.state.approve_policy = policy;

        // Quotes in flight were requested under the old policy.
        if matches!(&self.resolution, Some(r) if r.work == Work::Quotes) {
            self.resolve(reply);
            return;
        }

        if !self.state.providers.iter().any(needs_approval) {
            self.publish();
            let _ = reply.send(Ok(self.state.clone()));
            return;
        }

        self.cancel_resolution();
        self.state.status = ExpressStatus::Resolving;
        self.publish();
        let work = resolution::reestimate_approvals(self.state.providers.clone(), policy, self.fees.clone());
        self.spawn_resolution(Work::Approvals, work, reply);
    }

    fn update_selected_provider(&mut self, provider_id: String, reply: Reply<ExpressManagerState>) {
        let Some(entry) = self.state.provider(&provider_id).cloned() else {
            let _ = reply.send(Err(ExpressError::ProviderNotEligible(provider_id)));
            return;
        };
        debug!(provider = %provider_id, available = entry.is_available(), "provider switched");

        self.supersede_exchange();
        self.state.selected_provider = Some(entry.provider.clone());
        self.state.update_source = Some(ExpressProviderUpdateSource::ProviderSwitch);
        if !self.state.status.is_resolving() {
            self.state.status = status_for(&entry, self.state.fee_option);
        }
        self.publish();
        let _ = reply.send(Ok(self.state.clone()));
    }

    fn request_data(&mut self, reply: Reply<ExpressTransactionData>) {
        if self.exchange.is_some() {
            let _ = reply.send(Err(ExpressError::InvalidState(
                "trade initiation already in progress".into(),
            )));
            return;
        }
        let Some(ready) = self.state.status.ready().cloned() else {
            let _ = reply.send(Err(ExpressError::InvalidState(format!(
                "no ready quote (status is {})",
                self.state.status.label()
            ))));
            return;
        };
        if ready.provider.provider_type != ExpressProviderType::Cex {
            let _ = reply.send(Err(ExpressError::InvalidState(format!(
                "provider {} is {}, trade data is only available from a CEX",
                ready.provider.id, ready.provider.provider_type
            ))));
            return;
        }
        let (Some(pair), Some(provider)) = (self.state.pair.clone(), self.pool.get(&ready.provider.id)) else {
            let _ = reply.send(Err(ExpressError::ProviderNotEligible(ready.provider.id)));
            return;
        };

        let request = ExchangeDataRequest {
            provider_id: ready.provider.id.clone(),
            pair,
            amount: ready.quote.from_amount,
            expect_amount: ready.quote.expect_amount,
        };
        self.ticket += 1;
        let ticket = self.ticket;
        let timeout = self.config.timeouts.exchange_data;
        let results = self.results_tx.clone();
        debug!(provider = %request.provider_id, ticket, "requesting trade data");

        let task = tokio::spawn(async move {
            let result = with_timeout(timeout, "exchange_data", provider.exchange_data(&request)).await;
            let _ = results.send(TaskResult::Exchange { ticket, result });
        });
        self.exchange = Some(Exchange { ticket, task, reply });
    }

    /// Starts a full resolution for the current inputs, or settles without one
    fn resolve(&mut self, reply: Reply<ExpressManagerState>) {
        self.cancel_resolution();

        let amount = self.state.amount;
        match resolution::plan(&self.pool, self.state.pair.as_ref(), amount) {
            Plan::Settle(status) => {
                debug!(status = status.label(), "settled without network calls");
                self.state.status = status;
                self.publish();
                let _ = reply.send(Ok(self.state.clone()));
            }
            Plan::Resolve(providers) => {
                let (Some(pair), Some(amount)) = (self.state.pair.clone(), amount) else {
                    let _ = reply.send(Err(ExpressError::InvalidState("pair and amount required".into())));
                    return;
                };
                info!(
                    generation = self.generation,
                    pair = %pair,
                    amount = %amount,
                    providers = providers.len(),
                    "resolving quotes"
                );
                self.state.status = ExpressStatus::Resolving;
                self.publish();
                let work = resolution::quote_all(
                    providers,
                    pair,
                    amount,
                    self.state.approve_policy,
                    self.fees.clone(),
                    self.config.timeouts.quote,
                );
                self.spawn_resolution(Work::Quotes, work, reply);
            }
        }
    }

    fn spawn_resolution<F>(&mut self, work: Work, future: F, reply: Reply<ExpressManagerState>)
    where
        F: Future<Output = Vec<ExpressAvailableProvider>> + Send + 'static,
    {
        let generation = self.generation;
        let results = self.results_tx.clone();
        let task = tokio::spawn(async move {
            let providers = future.await;
            let _ = results.send(TaskResult::Resolved { generation, providers });
        });
        self.resolution = Some(Resolution { work, task, reply });
    }

    /// Invalidates the running resolution; its caller sees `Superseded`
    fn cancel_resolution(&mut self) {
        self.generation += 1;
        if let Some(previous) = self.resolution.take() {
            trace!(generation = self.generation, "superseding resolution");
            previous.task.abort();
            let _ = previous.reply.send(Err(ExpressError::Superseded));
        }
    }

    fn supersede_exchange(&mut self) {
        if let Some(exchange) = self.exchange.take() {
            debug!(ticket = exchange.ticket, "trade initiation superseded");
            exchange.task.abort();
            let _ = exchange.reply.send(Err(ExpressError::Superseded));
        }
    }

    fn finish(&mut self, result: TaskResult) {
        match result {
            TaskResult::Resolved { generation, providers } => {
                if generation != self.generation {
                    trace!(generation, current = self.generation, "dropping stale resolution");
                    return;
                }
                if let Some(resolution) = self.resolution.take() {
                    self.commit(providers);
                    let _ = resolution.reply.send(Ok(self.state.clone()));
                }
            }
            TaskResult::Exchange { ticket, result } => match self.exchange.take() {
                Some(exchange) if exchange.ticket == ticket => {
                    let selected_fee = self.state.status.ready().map(|ready| ready.selected_fee);
                    let result = result.map(|mut data| {
                        data.fee = selected_fee;
                        data
                    });
                    if let Err(error) = &result {
                        warn!(ticket, error = %error, "trade initiation failed");
                    }
                    let _ = exchange.reply.send(result);
                }
                other => {
                    trace!(ticket, "dropping stale trade data");
                    self.exchange = other;
                }
            },
        }
    }

    /// Applies a finished resolution and publishes it in one step
    fn commit(&mut self, mut providers: Vec<ExpressAvailableProvider>) {
        let preferred = self.preferred.take();
        let previous = self
            .state
            .selected_provider
            .as_ref()
            .map(|p| p.id.clone())
            .or(preferred);
        match select_provider(&mut providers, previous.as_deref()) {
            Some(index) => {
                let entry = &providers[index];
                self.state.selected_provider = Some(entry.provider.clone());
                self.state.status = status_for(entry, self.state.fee_option);
            }
            None => {
                let decimals = self
                    .state
                    .amount
                    .map(|amount| amount.decimals)
                    .unwrap_or_default();
                self.state.selected_provider = None;
                self.state.status = ExpressStatus::Failed(aggregate_failure(&providers, decimals));
            }
        }
        self.state.providers = providers;

        info!(
            generation = self.generation,
            status = self.state.status.label(),
            selected = self.state.selected_provider.as_ref().map(|p| p.id.as_str()),
            "resolution committed"
        );
        self.publish();
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn close(&mut self) {
        self.generation += 1;
        if let Some(resolution) = self.resolution.take() {
            resolution.task.abort();
            let _ = resolution.reply.send(Err(ExpressError::ManagerClosed));
        }
        if let Some(exchange) = self.exchange.take() {
            exchange.task.abort();
            let _ = exchange.reply.send(Err(ExpressError::ManagerClosed));
        }

        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            command.reject(ExpressError::ManagerClosed);
        }
    }
}
