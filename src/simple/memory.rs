// Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! In-memory collection used to test [super::SimpleCollection] without a secret service.

use super::backend::CollectionBackend;
use crate::error::Error;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use zeroize::Zeroizing;

pub(crate) const COLLECTION_PATH: &str = "/org/freedesktop/secrets/collection/test";

pub(crate) struct StoredItem {
    pub(crate) label: String,
    pub(crate) secret: Vec<u8>,
    pub(crate) attributes: HashMap<String, String>,
}

/// Observable state of the fake service. Tests keep a clone of the `Rc` to inspect it.
#[derive(Default)]
pub(crate) struct State {
    pub(crate) items: BTreeMap<String, StoredItem>,
    pub(crate) locked: bool,
    pub(crate) deleted: bool,
    pub(crate) is_default: bool,
    /// Unlock attempts are refused, as when the user dismisses the prompt.
    pub(crate) refuse_unlock: bool,
    /// Every call fails, as when the bus connection is gone.
    pub(crate) broken: bool,
    pub(crate) unlocks: usize,
    pub(crate) closes: usize,
    next_id: usize,
}

pub(crate) struct MemoryCollection {
    state: Rc<RefCell<State>>,
}

impl MemoryCollection {
    pub(crate) fn new() -> (Self, Rc<RefCell<State>>) {
        let state = Rc::new(RefCell::new(State::default()));
        (
            MemoryCollection {
                state: state.clone(),
            },
            state,
        )
    }

    fn check(&self) -> Result<(), Error> {
        if self.state.borrow().broken {
            Err(zbus::Error::InputOutput(std::io::Error::other("connection closed").into()).into())
        } else {
            Ok(())
        }
    }

    fn check_unlocked(&self) -> Result<(), Error> {
        self.check()?;
        if self.state.borrow().locked {
            Err(Error::Locked)
        } else {
            Ok(())
        }
    }

    fn missing_collection() -> Error {
        zbus::fdo::Error::UnknownObject(COLLECTION_PATH.to_owned()).into()
    }
}

impl CollectionBackend for MemoryCollection {
    fn is_default(&self) -> bool {
        self.state.borrow().is_default
    }

    fn is_locked(&self) -> Result<bool, Error> {
        self.check()?;
        let state = self.state.borrow();
        if state.deleted {
            Err(Self::missing_collection())
        } else {
            Ok(state.locked)
        }
    }

    fn unlock(&self) -> Result<(), Error> {
        self.check()?;
        let mut state = self.state.borrow_mut();
        state.unlocks += 1;
        if state.refuse_unlock {
            Err(Error::Prompt)
        } else {
            state.locked = false;
            Ok(())
        }
    }

    fn lock(&self) -> Result<(), Error> {
        self.check()?;
        self.state.borrow_mut().locked = true;
        Ok(())
    }

    fn create_item(
        &self,
        label: &str,
        secret: &[u8],
        attributes: HashMap<&str, &str>,
    ) -> Result<String, Error> {
        self.check_unlocked()?;
        let mut state = self.state.borrow_mut();
        if state.deleted {
            return Err(Self::missing_collection());
        }

        state.next_id += 1;
        let path = format!("{COLLECTION_PATH}/{}", state.next_id);
        let attributes = attributes
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        state.items.insert(
            path.clone(),
            StoredItem {
                label: label.to_owned(),
                secret: secret.to_vec(),
                attributes,
            },
        );

        Ok(path)
    }

    fn search_items(&self, attributes: HashMap<&str, &str>) -> Result<Vec<String>, Error> {
        self.check()?;
        let state = self.state.borrow();

        Ok(state
            .items
            .iter()
            .filter(|(_, item)| {
                attributes
                    .iter()
                    .all(|(k, v)| item.attributes.get(*k).map(String::as_str) == Some(*v))
            })
            .map(|(path, _)| path.clone())
            .collect())
    }

    fn get_secret(&self, item: &str) -> Result<Option<Zeroizing<Vec<u8>>>, Error> {
        self.check_unlocked()?;
        Ok(self
            .state
            .borrow()
            .items
            .get(item)
            .map(|item| Zeroizing::new(item.secret.clone())))
    }

    fn get_label(&self, item: &str) -> Result<Option<String>, Error> {
        self.check()?;
        Ok(self
            .state
            .borrow()
            .items
            .get(item)
            .map(|item| item.label.clone()))
    }

    fn get_attributes(&self, item: &str) -> Result<Option<HashMap<String, String>>, Error> {
        self.check()?;
        Ok(self
            .state
            .borrow()
            .items
            .get(item)
            .map(|item| item.attributes.clone()))
    }

    fn update_item(
        &self,
        item: &str,
        label: Option<&str>,
        secret: Option<&[u8]>,
        attributes: Option<HashMap<&str, &str>>,
    ) -> Result<bool, Error> {
        self.check_unlocked()?;
        let mut state = self.state.borrow_mut();
        let Some(stored) = state.items.get_mut(item) else {
            return Ok(false);
        };

        if let Some(label) = label {
            stored.label = label.to_owned();
        }
        if let Some(secret) = secret {
            stored.secret = secret.to_vec();
        }
        if let Some(attributes) = attributes {
            stored.attributes = attributes
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
        }

        Ok(true)
    }

    fn delete_item(&self, item: &str) -> Result<(), Error> {
        self.check_unlocked()?;
        self.state.borrow_mut().items.remove(item);
        Ok(())
    }

    fn delete(&self) -> Result<(), Error> {
        self.check_unlocked()?;
        let mut state = self.state.borrow_mut();
        state.items.clear();
        state.deleted = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.state.borrow_mut().closes += 1;
        Ok(())
    }
}
