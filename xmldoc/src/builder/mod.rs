//! Conversion between elements and typed application objects.
//!
//! An [`XmlBuilder`] turns an element into an [`XmlObject`] (`build`) and,
//! optionally, back (`generate`). A builder that meets an element it does not
//! understand hands it to its delegate, usually the [`CompositeBuilder`] that
//! created it, which picks a builder by tag or type name from its registry.

mod composite;

pub use composite::{BuilderDecl, BuilderFactory, CompositeBuilder};

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::node::ElementRef;

/// An application object produced by a builder.
pub trait XmlObject: Any {
    /// Type name used to pick a builder in [`XmlBuilder::generate`].
    fn class_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

impl dyn XmlObject {
    /// Returns the object as a `T` if that is its concrete type.
    pub fn downcast_ref<T: XmlObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn is<T: XmlObject>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl fmt::Debug for dyn XmlObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XmlObject({})", self.class_name())
    }
}

/// Storage for a builder's delegate.
#[derive(Default)]
pub struct DelegateSlot(RefCell<Option<Rc<dyn XmlBuilder>>>);

impl DelegateSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Rc<dyn XmlBuilder>> {
        self.0.borrow().clone()
    }

    pub fn set(&self, delegate: Option<Rc<dyn XmlBuilder>>) {
        *self.0.borrow_mut() = delegate;
    }
}

impl fmt::Debug for DelegateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.0.borrow().is_some() {
            "set"
        } else {
            "empty"
        };
        f.debug_tuple("DelegateSlot").field(&state).finish()
    }
}

/// Converts between elements and application objects.
///
/// Implementors provide `build` and `delegate_slot`; delegation is handled
/// by the provided methods.
pub trait XmlBuilder {
    /// Builds an object of type `type_name` from `element`.
    fn build(&self, element: &ElementRef, type_name: &str) -> Result<Box<dyn XmlObject>>;

    /// Produces an element describing `object`. Not every builder supports
    /// this direction.
    fn generate(&self, object: &dyn XmlObject) -> Result<ElementRef> {
        Err(Error::UnsupportedOperation(format!(
            "generating elements from {}",
            object.class_name()
        )))
    }

    fn delegate_slot(&self) -> &DelegateSlot;

    /// Sets the builder that receives what this one cannot handle.
    fn set_delegate(&self, delegate: Option<Rc<dyn XmlBuilder>>) {
        self.delegate_slot().set(delegate);
    }

    fn delegate(&self) -> Option<Rc<dyn XmlBuilder>> {
        self.delegate_slot().get()
    }

    /// Builds through the delegate, failing with [`Error::UnknownType`] when
    /// there is none.
    fn build_delegated(&self, element: &ElementRef, type_name: &str) -> Result<Box<dyn XmlObject>> {
        match self.delegate() {
            Some(delegate) => delegate.build(element, type_name),
            None => Err(Error::UnknownType(type_name.to_string())),
        }
    }

    /// Generates through the delegate, failing with [`Error::UnknownType`]
    /// when there is none.
    fn generate_delegated(&self, object: &dyn XmlObject) -> Result<ElementRef> {
        match self.delegate() {
            Some(delegate) => delegate.generate(object),
            None => Err(Error::UnknownType(object.class_name().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::XmlElement;

    struct Label(String);

    impl XmlObject for Label {
        fn class_name(&self) -> &str {
            "test.Label"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct LabelBuilder {
        delegate: DelegateSlot,
    }

    impl XmlBuilder for LabelBuilder {
        fn build(&self, element: &ElementRef, type_name: &str) -> Result<Box<dyn XmlObject>> {
            if element.borrow().tag() != "label" {
                return self.build_delegated(element, type_name);
            }
            Ok(Box::new(Label(element.borrow().text().to_string())))
        }

        fn delegate_slot(&self) -> &DelegateSlot {
            &self.delegate
        }
    }

    #[test]
    fn test_build_and_downcast() {
        let element = XmlElement::new("label");
        element.borrow_mut().set_text("hello");

        let object = LabelBuilder::default().build(&element, "test.Label").unwrap();
        assert!(object.is::<Label>());
        assert_eq!(object.downcast_ref::<Label>().unwrap().0, "hello");
        assert_eq!(object.class_name(), "test.Label");
    }

    #[test]
    fn test_generate_is_unsupported_by_default() {
        let err = LabelBuilder::default()
            .generate(&Label("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));
    }

    #[test]
    fn test_unknown_element_goes_to_delegate() {
        let builder = LabelBuilder::default();
        let element = XmlElement::new("other");
        let err = builder.build(&element, "test.Other").unwrap_err();
        assert!(matches!(err, Error::UnknownType(ref t) if t == "test.Other"));

        // A delegate that understands labels only sees the same element.
        builder.set_delegate(Some(Rc::new(LabelBuilder::default())));
        assert!(builder.delegate().is_some());
        let err = builder.build(&element, "test.Other").unwrap_err();
        assert!(matches!(err, Error::UnknownType(_)));

        builder.set_delegate(None);
        assert!(builder.delegate().is_none());
    }
}
