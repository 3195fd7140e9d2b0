//! Phone participant: message threads with known contacts.
//!
//! RULES:
//!   - One thread per known contact per cycle; texts only grow.
//!   - A new cycle starts with an empty thread for every collected contact.
//!   - Replies come from a `ChatResponder` after a fixed delay. A reply
//!     still pending when the cycle resets is dropped with the cycle.

use crate::{
    error::{GameError, GameResult},
    participant::{Participant, Resettable, SaveAware, UnlockObserver, Unlocked},
    save_data::{Message, SaveFile},
    types::ContactId,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

/// Produces the contact's side of a conversation.
pub trait ChatResponder {
    fn respond(&mut self, contact_id: ContactId, text: &str) -> String;
}

/// Answers everything with the same line.
pub struct CannedResponder {
    reply: String,
}

impl CannedResponder {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

impl ChatResponder for CannedResponder {
    fn respond(&mut self, _contact_id: ContactId, _text: &str) -> String {
        self.reply.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadPreview {
    pub contact_id: ContactId,
    pub preview:    String,
}

#[derive(Debug, Clone)]
struct PendingReply {
    contact_id: ContactId,
    due_in:     f32,
    text:       String,
}

pub struct PhoneParticipant {
    threads:     Vec<Message>,
    open_chat:   Option<ContactId>,
    pending:     Vec<PendingReply>,
    reply_delay: f32,
    responder:   Box<dyn ChatResponder>,
}

impl PhoneParticipant {
    pub fn new(reply_delay: f32, responder: Box<dyn ChatResponder>) -> Self {
        Self {
            threads: Vec::new(),
            open_chat: None,
            pending: Vec::new(),
            reply_delay,
            responder,
        }
    }

    pub fn threads(&self) -> &[Message] {
        &self.threads
    }

    pub fn thread(&self, contact_id: ContactId) -> Option<&Message> {
        self.threads.iter().find(|t| t.contact_id == contact_id)
    }

    pub fn previews(&self) -> Vec<ThreadPreview> {
        self.threads
            .iter()
            .map(|t| ThreadPreview { contact_id: t.contact_id, preview: t.preview().to_string() })
            .collect()
    }

    pub fn open_chat(&self) -> Option<ContactId> {
        self.open_chat
    }

    pub fn pending_replies(&self) -> usize {
        self.pending.len()
    }

    pub fn open(&mut self, contact_id: ContactId) -> GameResult<()> {
        if self.thread(contact_id).is_none() {
            return Err(GameError::UnknownThread { id: contact_id });
        }
        self.open_chat = Some(contact_id);
        Ok(())
    }

    pub fn close(&mut self) {
        self.open_chat = None;
    }

    /// Append the player's text and schedule the reply. Blank input is
    /// ignored and returns false.
    pub fn send_message(&mut self, contact_id: ContactId, text: &str) -> GameResult<bool> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        let thread = self
            .threads
            .iter_mut()
            .find(|t| t.contact_id == contact_id)
            .ok_or(GameError::UnknownThread { id: contact_id })?;
        thread.push(text, false);

        let reply = self.responder.respond(contact_id, text);
        self.pending.push(PendingReply { contact_id, due_in: self.reply_delay, text: reply });
        log::debug!("message sent to contact {contact_id}");
        Ok(true)
    }

    fn thread_mut(&mut self, contact_id: ContactId) -> &mut Message {
        let index = match self.threads.iter().position(|t| t.contact_id == contact_id) {
            Some(index) => index,
            None => {
                self.threads.push(Message::new(contact_id));
                self.threads.len() - 1
            }
        };
        &mut self.threads[index]
    }

    fn clear_transient(&mut self) {
        self.pending.clear();
        if self.open_chat.is_some_and(|id| self.thread(id).is_none()) {
            self.open_chat = None;
        }
    }
}

impl SaveAware for PhoneParticipant {
    fn gather(&mut self, save: &mut SaveFile) -> GameResult<()> {
        for thread in self.threads.iter().filter(|t| !t.texts.is_empty()) {
            let saved = save.current_cycle.ensure_thread(thread.contact_id);
            if !thread.texts.starts_with(&saved.texts) {
                return Err(GameError::Other(anyhow::anyhow!(
                    "thread for contact {} diverged from the saved one",
                    thread.contact_id
                )));
            }
            saved.texts = thread.texts.clone();
        }
        Ok(())
    }

    fn restore(&mut self, save: &SaveFile) -> GameResult<()> {
        self.threads.clear();
        for contact in &save.collected_contacts {
            let thread = save
                .current_cycle
                .thread(contact.id)
                .cloned()
                .unwrap_or_else(|| Message::new(contact.id));
            self.threads.push(thread);
        }
        for thread in &save.current_cycle.messages {
            if self.thread(thread.contact_id).is_none() {
                self.threads.push(thread.clone());
            }
        }
        self.clear_transient();
        Ok(())
    }
}

impl Resettable for PhoneParticipant {
    fn reset(&mut self, save: &SaveFile) -> GameResult<()> {
        self.threads = save.collected_contacts.iter().map(|c| Message::new(c.id)).collect();
        self.open_chat = None;
        self.clear_transient();
        Ok(())
    }
}

impl UnlockObserver for PhoneParticipant {
    fn on_unlocked(&mut self, item: Unlocked, _save: &SaveFile) -> GameResult<bool> {
        match item {
            Unlocked::Contact(id) => {
                self.thread_mut(id);
                Ok(true)
            }
            Unlocked::Clue(_) => Ok(false),
        }
    }
}

impl Participant for PhoneParticipant {
    fn name(&self) -> &'static str {
        "phone"
    }

    fn as_save_aware(&mut self) -> Option<&mut dyn SaveAware> {
        Some(self)
    }

    fn as_resettable(&mut self) -> Option<&mut dyn Resettable> {
        Some(self)
    }

    fn as_unlock_observer(&mut self) -> Option<&mut dyn UnlockObserver> {
        Some(self)
    }

    fn update(&mut self, dt: f32) {
        if self.pending.is_empty() {
            return;
        }
        for reply in self.pending.iter_mut() {
            reply.due_in -= dt;
        }
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|r| r.due_in <= 0.0);
        self.pending = waiting;
        for reply in due {
            self.thread_mut(reply.contact_id).push(reply.text, true);
            log::debug!("reply received from contact {}", reply.contact_id);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
