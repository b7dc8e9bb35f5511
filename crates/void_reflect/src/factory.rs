//! Name-keyed construction of attributed objects

use crate::attributed::{Attributed, Reflected};
use crate::error::{ReflectError, Result};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

type Constructor = Box<dyn Fn() -> Rc<dyn Reflected>>;

/// Maps class names to default constructors
#[derive(Default)]
pub struct Factory {
    constructors: HashMap<String, Constructor>,
}

impl Factory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its type name
    pub fn register<T: Attributed + Default>(&mut self) -> Result<()> {
        self.register_with(T::TYPE_NAME, || -> Rc<dyn Reflected> { Rc::new(T::default()) })
    }

    /// Register a custom constructor under `class`
    pub fn register_with<F>(&mut self, class: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn() -> Rc<dyn Reflected> + 'static,
    {
        let class = class.into();
        if self.constructors.contains_key(&class) {
            return Err(ReflectError::DuplicateClass(class));
        }
        log::debug!("Factory registered '{}'", class);
        self.constructors.insert(class, Box::new(constructor));
        Ok(())
    }

    pub fn deregister(&mut self, class: &str) -> bool {
        self.constructors.remove(class).is_some()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.constructors.contains_key(class)
    }

    /// Construct a default instance of `class`
    pub fn create(&self, class: &str) -> Result<Rc<dyn Reflected>> {
        self.constructors
            .get(class)
            .map(|constructor| constructor())
            .ok_or_else(|| ReflectError::UnknownClass(class.to_string()))
    }

    /// Registered class names, unordered
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<&str> = self.classes().collect();
        classes.sort_unstable();
        f.debug_struct("Factory").field("classes", &classes).finish()
    }
}
