// Copyright 2026 the acequia authors
// SPDX-License-Identifier: Apache-2.0

//! Channel trait definitions
//!
//! The stateful channels (push socket, serial link) share a small
//! lifecycle surface so consumers can hold either behind one interface.
//! The request channel is connectionless and stays outside it.

/// Lifecycle surface shared by the connection-holding channels.
pub trait Transport: Send + Sync {
    /// Get channel name/type
    fn transport_type(&self) -> &'static str;

    /// Check whether the channel currently holds a live connection
    fn is_connected(&self) -> bool;

    /// Drop the current connection, if any. Does not prevent a later
    /// reconnect.
    fn disconnect(&self);
}
