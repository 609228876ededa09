//! Events fired by the TCP server for each connection.
//!
//! Each event owns the [`ConnectionContext`] while its handler runs and dereferences
//! to it, so a handler reads the content and chooses the next operation directly on
//! the event. The registry the event was dispatched from is reachable through
//! [`registry`](ConnectionAccepted::registry) for handlers that fire events of their own.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::event::{Event, EventKind, EventRegistry};
use crate::server::ConnectionContext;

pub(crate) trait ContextEvent: Event + Sized {
    fn wrap(ctx: ConnectionContext, registry: Arc<EventRegistry>) -> Self;

    fn into_context(self) -> ConnectionContext;
}

macro_rules! context_events {
    ($($(#[$docs:meta])* $name:ident => $kind:expr;)+) => {
        $(
            $(#[$docs])*
            #[derive(Debug)]
            pub struct $name {
                ctx: ConnectionContext,
                registry: Arc<EventRegistry>,
            }

            impl $name {
                pub fn context(&self) -> &ConnectionContext {
                    &self.ctx
                }

                pub fn context_mut(&mut self) -> &mut ConnectionContext {
                    &mut self.ctx
                }

                pub fn registry(&self) -> &Arc<EventRegistry> {
                    &self.registry
                }
            }

            impl Event for $name {
                const KIND: EventKind = $kind;
            }

            impl ContextEvent for $name {
                fn wrap(ctx: ConnectionContext, registry: Arc<EventRegistry>) -> Self {
                    Self { ctx, registry }
                }

                fn into_context(self) -> ConnectionContext {
                    self.ctx
                }
            }

            impl Deref for $name {
                type Target = ConnectionContext;

                fn deref(&self) -> &Self::Target {
                    &self.ctx
                }
            }

            impl DerefMut for $name {
                fn deref_mut(&mut self) -> &mut Self::Target {
                    &mut self.ctx
                }
            }
        )+
    };
}

context_events! {
    /// A connection was accepted. The default handler clears the buffer and reads.
    ConnectionAccepted => EventKind::CONNECTION_ACCEPTED;

    /// A read completed with at least one byte; the content holds what arrived.
    /// The default handler closes the connection.
    DataReceived => EventKind::DATA_RECEIVED;

    /// A write of the whole content completed. The default handler closes the connection.
    DataSent => EventKind::DATA_SENT;
}
