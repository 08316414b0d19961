// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic function adapter.
//!
//! Wraps a statically-typed callable into an object invokable with a vector
//! of dynamic argument values. Descriptors for the return type and each
//! parameter are recorded at wrap time; at call time each provided value is
//! re-cast into the expected parameter type with no conversion (callers
//! route through the conversion engine first when shapes differ), the
//! callable runs, and the result comes back as an owning [`Value`].

use crate::dynamic::{type_of, FromValue, IntoValue, Reflect, TypeDescriptor, Value};
use crate::error::{Error, Result};
use std::sync::Arc;

type Callable = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// A dynamically-invokable callable with recorded type descriptors.
#[derive(Clone)]
pub struct GenericFunction {
    return_type: Arc<TypeDescriptor>,
    argument_types: Vec<Arc<TypeDescriptor>>,
    callable: Callable,
}

impl std::fmt::Debug for GenericFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericFunction")
            .field("return_type", &self.return_type.name())
            .field(
                "argument_types",
                &self
                    .argument_types
                    .iter()
                    .map(|a| a.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl GenericFunction {
    /// Wrap a fully-dynamic callable with explicit descriptors.
    ///
    /// Used where the parameter shapes are only known at runtime (service
    /// plumbing); statically-typed code goes through
    /// [`IntoGenericFunction`] instead.
    pub fn from_raw(
        return_type: Arc<TypeDescriptor>,
        argument_types: Vec<Arc<TypeDescriptor>>,
        callable: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            return_type,
            argument_types,
            callable: Arc::new(callable),
        }
    }

    /// The recorded return descriptor.
    pub fn return_type(&self) -> &Arc<TypeDescriptor> {
        &self.return_type
    }

    /// The recorded parameter descriptors, in declaration order.
    pub fn argument_types(&self) -> &[Arc<TypeDescriptor>] {
        &self.argument_types
    }

    /// Compact signature of the parenthesized parameter list.
    pub fn parameters_signature(&self) -> String {
        let mut out = String::from("(");
        for a in &self.argument_types {
            out.push_str(&a.signature());
        }
        out.push(')');
        out
    }

    /// Compact signature of the return type.
    pub fn return_signature(&self) -> String {
        self.return_type.signature()
    }

    /// Invoke with dynamic arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        if args.len() != self.argument_types.len() {
            return Err(Error::Protocol(format!(
                "argument count mismatch: expected {}, got {}",
                self.argument_types.len(),
                args.len()
            )));
        }
        (self.callable)(args)
    }
}

/// Statically-typed callables convertible into a [`GenericFunction`].
///
/// Implemented for `Fn(A1, ..., An) -> R` up to four parameters, where every
/// parameter and the return type are [`Reflect`].
pub trait IntoGenericFunction<Args> {
    fn into_generic_function(self) -> GenericFunction;
}

macro_rules! impl_into_generic {
    ($($name:ident : $idx:tt),*) => {
        impl<Fun, Ret, $($name),*> IntoGenericFunction<($($name,)*)> for Fun
        where
            Fun: Fn($($name),*) -> Ret + Send + Sync + 'static,
            Ret: Reflect + IntoValue,
            $($name: Reflect + FromValue,)*
        {
            #[allow(non_snake_case)]
            fn into_generic_function(self) -> GenericFunction {
                GenericFunction {
                    return_type: type_of::<Ret>(),
                    argument_types: vec![$(type_of::<$name>()),*],
                    callable: Arc::new(move |_args: &[Value]| {
                        $(let $name = $name::from_value(&_args[$idx])?;)*
                        Ok(self($($name),*).into_value())
                    }),
                }
            }
        }
    };
}

impl_into_generic!();
impl_into_generic!(A0: 0);
impl_into_generic!(A0: 0, A1: 1);
impl_into_generic!(A0: 0, A1: 1, A2: 2);
impl_into_generic!(A0: 0, A1: 1, A2: 2, A3: 3);

/// Instance methods convertible into a bound [`GenericFunction`].
///
/// The receiver is pre-bound at the head of the parameter list, so the
/// resulting adapter exposes only the remaining parameters.
pub trait IntoBoundFunction<Recv, Args> {
    fn into_bound_function(self, instance: Arc<Recv>) -> GenericFunction;
}

macro_rules! impl_into_bound {
    ($($name:ident : $idx:tt),*) => {
        impl<Fun, Recv, Ret, $($name),*> IntoBoundFunction<Recv, ($($name,)*)> for Fun
        where
            Fun: Fn(&Recv, $($name),*) -> Ret + Send + Sync + 'static,
            Recv: Send + Sync + 'static,
            Ret: Reflect + IntoValue,
            $($name: Reflect + FromValue,)*
        {
            #[allow(non_snake_case)]
            fn into_bound_function(self, instance: Arc<Recv>) -> GenericFunction {
                GenericFunction {
                    return_type: type_of::<Ret>(),
                    argument_types: vec![$(type_of::<$name>()),*],
                    callable: Arc::new(move |_args: &[Value]| {
                        $(let $name = $name::from_value(&_args[$idx])?;)*
                        Ok(self(&*instance, $($name),*).into_value())
                    }),
                }
            }
        }
    };
}

impl_into_bound!();
impl_into_bound!(A0: 0);
impl_into_bound!(A0: 0, A1: 1);
impl_into_bound!(A0: 0, A1: 1, A2: 2);

impl GenericFunction {
    /// Wrap an instance method, pre-binding `instance` as the receiver.
    pub fn bind<Recv, Args, F>(instance: Arc<Recv>, f: F) -> Self
    where
        F: IntoBoundFunction<Recv, Args>,
    {
        f.into_bound_function(instance)
    }
}
