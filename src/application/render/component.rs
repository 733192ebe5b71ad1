//! Contracts between the delivery adapters and the component tree.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{
    context::RenderContext,
    destination::RenderDestination,
    types::{RenderError, RouteData, ShortCircuit},
};

pub type Props = Map<String, Value>;

/// Named children passed to an entry component.
pub type Slots = BTreeMap<String, Arc<dyn RenderTemplate>>;

/// A composable render node. Writes its chunks into the destination in
/// document order and resolves once everything has been written.
#[async_trait]
pub trait RenderTemplate: Send + Sync {
    async fn render(&self, destination: &mut dyn RenderDestination) -> Result<(), RenderError>;
}

/// Entry point of a component tree.
#[async_trait]
pub trait ComponentFactory: Send + Sync {
    async fn call(
        &self,
        ctx: &Arc<RenderContext>,
        props: &Props,
        slots: &Slots,
    ) -> Result<ComponentOutput, RenderError>;
}

/// Deferred component instance whose head output is resolved before the
/// document head is finalised.
#[async_trait]
pub trait Propagator: Send + Sync {
    async fn init(&self, ctx: &Arc<RenderContext>) -> Result<ComponentOutput, RenderError>;
}

/// Body content paired with a fragment destined for the document head.
pub struct HeadAndContent {
    pub head: String,
    pub content: Box<ComponentOutput>,
}

impl HeadAndContent {
    pub fn new(head: impl Into<String>, content: ComponentOutput) -> Self {
        Self {
            head: head.into(),
            content: Box::new(content),
        }
    }
}

/// Everything a component invocation may produce.
pub enum ComponentOutput {
    Response(ShortCircuit),
    Template(Arc<dyn RenderTemplate>),
    HeadAndContent(HeadAndContent),
    /// Plain data; not renderable as a page.
    Data(Value),
}

impl ComponentOutput {
    pub fn template(template: impl RenderTemplate + 'static) -> Self {
        Self::Template(Arc::new(template))
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            ComponentOutput::Response(_) => "a response",
            ComponentOutput::Template(_) => "a template",
            ComponentOutput::HeadAndContent(_) => "head and content",
            ComponentOutput::Data(Value::Null) => "null",
            ComponentOutput::Data(Value::Bool(_)) => "a boolean",
            ComponentOutput::Data(Value::Number(_)) => "a number",
            ComponentOutput::Data(Value::String(_)) => "a string",
            ComponentOutput::Data(Value::Array(_)) => "an array",
            ComponentOutput::Data(Value::Object(_)) => "an object",
        }
    }
}

impl std::fmt::Debug for ComponentOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentOutput::Response(response) => f.debug_tuple("Response").field(response).finish(),
            ComponentOutput::Data(value) => f.debug_tuple("Data").field(value).finish(),
            other => f.write_str(other.describe()),
        }
    }
}

/// One entry invocation: the factory plus everything needed to call it.
#[derive(Clone)]
pub struct RenderCall {
    pub factory: Arc<dyn ComponentFactory>,
    pub props: Props,
    pub slots: Slots,
    pub is_page: bool,
    pub route: Option<RouteData>,
}

impl RenderCall {
    /// A full page render: doctype insertion and the head pass apply.
    pub fn page(factory: Arc<dyn ComponentFactory>) -> Self {
        Self {
            factory,
            props: Props::new(),
            slots: Slots::new(),
            is_page: true,
            route: None,
        }
    }

    /// A standalone component render.
    pub fn component(factory: Arc<dyn ComponentFactory>) -> Self {
        Self {
            is_page: false,
            ..Self::page(factory)
        }
    }

    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn with_slot(mut self, name: impl Into<String>, template: Arc<dyn RenderTemplate>) -> Self {
        self.slots.insert(name.into(), template);
        self
    }

    pub fn with_route(mut self, route: RouteData) -> Self {
        self.route = Some(route);
        self
    }
}

impl std::fmt::Debug for RenderCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCall")
            .field("props", &self.props)
            .field("slots", &self.slots.keys().collect::<Vec<_>>())
            .field("is_page", &self.is_page)
            .field("route", &self.route)
            .finish()
    }
}
