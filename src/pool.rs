// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Bounded connection pool.
//!
//! The pool is a channel pre-filled with one token per connection. Acquiring
//! receives a token, and the returned [`PoolSlot`] sends it back when dropped,
//! so a connection is released exactly once however its holder exits.

use crate::error::StorageError;
use crossbeam::channel::{self, Receiver, Sender};
use std::time::Duration;

#[derive(Debug)]
pub(crate) struct ConnectionPool {
    idle: Receiver<()>,
    release: Sender<()>,
    acquire_timeout: Duration,
}

impl ConnectionPool {
    pub(crate) fn new(size: usize, acquire_timeout: Duration) -> Self {
        let (release, idle) = channel::bounded(size);
        for _ in 0..size {
            // Capacity equals size and the receiver lives in `self`.
            let _ = release.send(());
        }
        Self {
            idle,
            release,
            acquire_timeout,
        }
    }

    /// Waits up to the acquire timeout for an idle connection.
    pub(crate) fn acquire(&self) -> Result<PoolSlot, StorageError> {
        self.idle
            .recv_timeout(self.acquire_timeout)
            .map(|()| PoolSlot {
                release: self.release.clone(),
            })
            .map_err(|_| StorageError::PoolTimeout)
    }

    pub(crate) fn idle(&self) -> usize {
        self.idle.len()
    }
}

/// Ownership of one pooled connection.
#[derive(Debug)]
pub(crate) struct PoolSlot {
    release: Sender<()>,
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        // Fails only once the pool itself is gone.
        let _ = self.release.send(());
    }
}
