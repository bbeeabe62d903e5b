use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    ContractTransitionedEvent,
    EventHandler,
    EventProducer,
    Handler,
    PaymentSettledEvent,
    PayoutCreatedEvent,
    WebhookAnomalyEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub contract_transitioned_producer: Vec<EventProducer<ContractTransitionedEvent>>,
    pub payment_settled_producer: Vec<EventProducer<PaymentSettledEvent>>,
    pub payout_created_producer: Vec<EventProducer<PayoutCreatedEvent>>,
    pub webhook_anomaly_producer: Vec<EventProducer<WebhookAnomalyEvent>>,
}

pub struct EventHandlers {
    pub on_contract_transitioned: Option<EventHandler<ContractTransitionedEvent>>,
    pub on_payment_settled: Option<EventHandler<PaymentSettledEvent>>,
    pub on_payout_created: Option<EventHandler<PayoutCreatedEvent>>,
    pub on_webhook_anomaly: Option<EventHandler<WebhookAnomalyEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_contract_transitioned = hooks.on_contract_transitioned.map(|f| EventHandler::new(buffer_size, f));
        let on_payment_settled = hooks.on_payment_settled.map(|f| EventHandler::new(buffer_size, f));
        let on_payout_created = hooks.on_payout_created.map(|f| EventHandler::new(buffer_size, f));
        let on_webhook_anomaly = hooks.on_webhook_anomaly.map(|f| EventHandler::new(buffer_size, f));
        Self { on_contract_transitioned, on_payment_settled, on_payout_created, on_webhook_anomaly }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_contract_transitioned {
            result.contract_transitioned_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_settled {
            result.payment_settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payout_created {
            result.payout_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_webhook_anomaly {
            result.webhook_anomaly_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_contract_transitioned {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_payment_settled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_payout_created {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_webhook_anomaly {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_contract_transitioned: Option<Handler<ContractTransitionedEvent>>,
    pub on_payment_settled: Option<Handler<PaymentSettledEvent>>,
    pub on_payout_created: Option<Handler<PayoutCreatedEvent>>,
    pub on_webhook_anomaly: Option<Handler<WebhookAnomalyEvent>>,
}

impl EventHooks {
    pub fn on_contract_transitioned<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ContractTransitionedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_contract_transitioned = Some(Arc::new(f));
        self
    }

    pub fn on_payment_settled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_settled = Some(Arc::new(f));
        self
    }

    pub fn on_payout_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PayoutCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payout_created = Some(Arc::new(f));
        self
    }

    pub fn on_webhook_anomaly<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WebhookAnomalyEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_webhook_anomaly = Some(Arc::new(f));
        self
    }
}
