//! Gateway calls off the frame loop.
//!
//! The viewer queues [`GatewayRequest`]s and applies [`GatewayReply`]s; it
//! never calls a gateway itself. [`GatewayWorker`] owns a gateway on a
//! background thread and answers requests in the order they were sent.
//! [`serve`] answers one request inline, for tests and headless tools.

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::deletion::DeleteRequest;
use crate::error::ViewerError;
use crate::gateway::{ChunkListing, DataGateway, DeleteOutcome, Save, SaveStats};

/// Why a chunk listing was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPurpose {
    /// Switch to the save: replace index, clear selection, refit
    Open,
    /// Refresh the current save, keeping what is still selected
    Reload,
}

/// Work for the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayRequest {
    /// [`DataGateway::list_saves`]
    ListSaves,
    /// [`DataGateway::list_chunks`]
    ListChunks {
        /// Save to list
        save: String,
        /// What the viewer does with the answer
        purpose: ListPurpose,
    },
    /// [`DataGateway::get_stats`]
    Stats {
        /// Save to measure
        save: String,
    },
    /// [`DataGateway::delete_chunks`]
    Delete(DeleteRequest),
}

/// A gateway answer, tagged with what it answers.
#[derive(Debug)]
pub enum GatewayReply {
    /// Answer to [`GatewayRequest::ListSaves`]
    Saves(Result<Vec<Save>, ViewerError>),
    /// Answer to [`GatewayRequest::ListChunks`]
    Chunks {
        /// Save that was listed
        save: String,
        /// Purpose given with the request
        purpose: ListPurpose,
        /// Listing or the reason there is none
        result: Result<ChunkListing, ViewerError>,
    },
    /// Answer to [`GatewayRequest::Stats`]
    Stats {
        /// Save that was measured
        save: String,
        /// Stats or the reason there are none
        result: Result<SaveStats, ViewerError>,
    },
    /// Answer to [`GatewayRequest::Delete`]
    Deleted(Result<DeleteOutcome, ViewerError>),
}

/// Run one request against `gateway` on the calling thread.
pub fn serve(gateway: &mut dyn DataGateway, request: GatewayRequest) -> GatewayReply {
    match request {
        GatewayRequest::ListSaves => GatewayReply::Saves(gateway.list_saves()),
        GatewayRequest::ListChunks { save, purpose } => {
            let result = gateway.list_chunks(&save);
            GatewayReply::Chunks {
                save,
                purpose,
                result,
            }
        }
        GatewayRequest::Stats { save } => {
            let result = gateway.get_stats(&save);
            GatewayReply::Stats { save, result }
        }
        GatewayRequest::Delete(req) => {
            GatewayReply::Deleted(gateway.delete_chunks(&req.save, &req.refs, req.create_backup))
        }
    }
}

/// Owns a gateway on a background thread.
///
/// Requests are answered one at a time in send order, so a reload queued
/// after a deletion always sees its result.
pub struct GatewayWorker {
    request_tx: Option<Sender<GatewayRequest>>,
    reply_rx: Receiver<GatewayReply>,
    worker: Option<JoinHandle<()>>,
    in_flight: usize,
}

impl GatewayWorker {
    /// Move `gateway` onto a new thread.
    pub fn spawn<G>(mut gateway: G) -> Self
    where
        G: DataGateway + Send + 'static,
    {
        let (request_tx, request_rx) = channel::<GatewayRequest>();
        let (reply_tx, reply_rx) = channel::<GatewayReply>();

        let worker = thread::spawn(move || {
            while let Ok(request) = request_rx.recv() {
                log::debug!("gateway: {:?}", request);
                if reply_tx.send(serve(&mut gateway, request)).is_err() {
                    break;
                }
            }
            log::debug!("gateway worker stopped");
        });

        GatewayWorker {
            request_tx: Some(request_tx),
            reply_rx,
            worker: Some(worker),
            in_flight: 0,
        }
    }

    /// Queue a request. `false` if the worker is gone.
    pub fn send(&mut self, request: GatewayRequest) -> bool {
        let Some(tx) = &self.request_tx else {
            return false;
        };
        match tx.send(request) {
            Ok(()) => {
                self.in_flight += 1;
                true
            }
            Err(e) => {
                log::error!("gateway worker is gone; dropped {:?}", e.0);
                false
            }
        }
    }

    /// Requests sent and not yet answered
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Replies that arrived since the last call; never blocks.
    pub fn drain(&mut self) -> Vec<GatewayReply> {
        let mut replies = Vec::new();
        loop {
            match self.reply_rx.try_recv() {
                Ok(reply) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    replies.push(reply);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.in_flight = 0;
                    break;
                }
            }
        }
        replies
    }

    /// Stop accepting requests and wait for the one in progress. A running
    /// deletion is finished, not abandoned.
    pub fn shutdown(mut self) {
        self.request_tx = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("gateway worker panicked");
            }
        }
    }
}

impl Drop for GatewayWorker {
    fn drop(&mut self) {
        // closing the channel lets the thread finish on its own
        self.request_tx = None;
    }
}
