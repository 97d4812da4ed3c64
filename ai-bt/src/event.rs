use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use ai_core::NameHash;

/// A named signal delivered to a running tree.
///
/// Identity is the case-insensitive hash of the name; the name itself is kept for logs only.
#[derive(Clone)]
pub struct Event {
    hash: NameHash,
    name: Cow<'static, str>,
    user_data: Option<Rc<dyn Any>>,
}

impl Event {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        Self {
            hash: NameHash::of(&name),
            name,
            user_data: None,
        }
    }

    pub fn with_user_data(mut self, data: Rc<dyn Any>) -> Self {
        self.user_data = Some(data);
        self
    }

    pub fn hash(&self) -> NameHash {
        self.hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn user_data(&self) -> Option<&Rc<dyn Any>> {
        self.user_data.as_ref()
    }

    pub fn user_data_as<T: 'static>(&self) -> Option<&T> {
        self.user_data.as_deref()?.downcast_ref::<T>()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Event {}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("hash", &self.hash)
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}
