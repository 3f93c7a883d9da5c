//! Absence marker and the `Datum` capability used to build group aggregates
//!
//! Every node has a well-defined input and output type, even at the edges
//! of a graph. `Absence` fills the slot where there is no data. When a
//! parallel group joins its branches, absent outputs are dropped from the
//! aggregate at the type level: `Datum::Cons` prepends a present value to
//! the rest of the list and leaves the list untouched for an absent one.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The "no data" marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Absence;

impl From<()> for Absence {
    fn from(_: ()) -> Self {
        Absence
    }
}

/// A value that can take part in a parallel group's aggregate.
///
/// Implemented for `Absence` and `()` as absent, and for common std types
/// as present. Register your own types with [`datum!`](crate::datum).
pub trait Datum: Send + Sized + 'static {
    /// `false` for absence markers
    const PRESENT: bool;

    /// Type of `self` prepended to `Rest`, or `Rest` itself when absent
    type Cons<Rest: Send + 'static>: Send + 'static;

    fn cons<Rest: Send + 'static>(self, rest: Rest) -> Self::Cons<Rest>;

    /// `Some(self)` for present values, `None` for absence
    fn present(self) -> Option<Self>;
}

impl Datum for Absence {
    const PRESENT: bool = false;
    type Cons<Rest: Send + 'static> = Rest;

    fn cons<Rest: Send + 'static>(self, rest: Rest) -> Rest {
        rest
    }

    fn present(self) -> Option<Self> {
        None
    }
}

impl Datum for () {
    const PRESENT: bool = false;
    type Cons<Rest: Send + 'static> = Rest;

    fn cons<Rest: Send + 'static>(self, rest: Rest) -> Rest {
        rest
    }

    fn present(self) -> Option<Self> {
        None
    }
}

/// Register types whose values are present in group aggregates.
///
/// ```
/// #[derive(Debug, Clone, PartialEq)]
/// struct Reading(f64);
///
/// daggr::datum!(Reading);
/// ```
#[macro_export]
macro_rules! datum {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Datum for $ty {
                const PRESENT: bool = true;
                type Cons<Rest: Send + 'static> = ($ty, Rest);

                fn cons<Rest: Send + 'static>(self, rest: Rest) -> Self::Cons<Rest> {
                    (self, rest)
                }

                fn present(self) -> Option<Self> {
                    Some(self)
                }
            }
        )+
    };
}

macro_rules! generic_datum {
    ($(impl<$($param:ident),+> for $ty:ty;)+) => {
        $(
            impl<$($param: Send + 'static),+> Datum for $ty {
                const PRESENT: bool = true;
                type Cons<Rest: Send + 'static> = ($ty, Rest);

                fn cons<Rest: Send + 'static>(self, rest: Rest) -> Self::Cons<Rest> {
                    (self, rest)
                }

                fn present(self) -> Option<Self> {
                    Some(self)
                }
            }
        )+
    };
}

datum!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str,
);

generic_datum! {
    impl<T> for Vec<T>;
    impl<T> for Option<T>;
    impl<T> for Box<T>;
    impl<T, E> for Result<T, E>;
    impl<K, V> for HashMap<K, V>;
    impl<K, V> for BTreeMap<K, V>;
    impl<A> for (A,);
    impl<A, B> for (A, B);
    impl<A, B, C> for (A, B, C);
    impl<A, B, C, D> for (A, B, C, D);
}

/// Converts a cons list `(A, (B, ()))` into the flat tuple `(A, B)`.
pub trait Flatten: Send + 'static {
    type Flat: Send + 'static;

    fn flatten(self) -> Self::Flat;
}

macro_rules! cons_list {
    () => { () };
    ($head:ident $(, $tail:ident)*) => { ($head, cons_list!($($tail),*)) };
}

macro_rules! flatten_impl {
    ($($name:ident),*) => {
        impl<$($name: Send + 'static),*> Flatten for cons_list!($($name),*) {
            type Flat = ($($name,)*);

            #[allow(non_snake_case, clippy::unused_unit)]
            fn flatten(self) -> Self::Flat {
                let cons_list!($($name),*) = self;
                ($($name,)*)
            }
        }
    };
}

flatten_impl!();
flatten_impl!(A);
flatten_impl!(A, B);
flatten_impl!(A, B, C);
flatten_impl!(A, B, C, D);
flatten_impl!(A, B, C, D, E);
flatten_impl!(A, B, C, D, E, F);
flatten_impl!(A, B, C, D, E, F, G);
flatten_impl!(A, B, C, D, E, F, G, H);
