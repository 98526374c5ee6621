use crate::join::control::{Control, Helpers, Operands, Slot, helper, sealed, take_slot};
use either::Either;
use std::future::IntoFuture;

macro_rules! one_of {
    ($name:ident { $($idx:tt => $var:ident($T:ident)),+ }) => {
        /// Output of [`when_any`](crate::when_any): the variant names the
        /// operand that finished first and holds its output.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name<$($T),+> {
            $($var($T),)+
        }

        impl<$($T),+> $name<$($T),+> {
            /// Position of the winning operand.
            pub fn index(&self) -> usize {
                match self {
                    $(Self::$var(_) => $idx,)+
                }
            }
        }
    };
}

macro_rules! impl_operands {
    ($len:literal, $one_of:ident { $($idx:tt => $var:ident($T:ident, $op:ident)),+ }) => {
        impl<$($T),+> sealed::Sealed for ($($T,)+) {}

        impl<$($T),+> Operands for ($($T,)+)
        where
            $(
                $T: IntoFuture,
                <$T as IntoFuture>::IntoFuture: 'static,
                <$T as IntoFuture>::Output: 'static,
            )+
        {
            type Output = ($(<$T as IntoFuture>::Output,)+);
            type OneOf = $one_of<$(<$T as IntoFuture>::Output),+>;
            type Slots = ($(Slot<<$T as IntoFuture>::Output>,)+);

            fn len(&self) -> usize {
                $len
            }

            fn into_helpers(self, control: &Control) -> (Helpers, Self::Slots) {
                let ($($op,)+) = self;
                let mut helpers = Helpers::new();

                let slots = ($(
                    {
                        let (frame, slot) = helper($idx, $op, control);
                        helpers.push(frame);
                        slot
                    },
                )+);

                (helpers, slots)
            }

            fn take_all(slots: &Self::Slots) -> Self::Output {
                ($(take_slot(&slots.$idx),)+)
            }

            fn take_one(slots: &Self::Slots, index: usize) -> Self::OneOf {
                match index {
                    $($idx => $one_of::$var(take_slot(&slots.$idx)),)+
                    _ => unreachable!("operand index {index} out of range"),
                }
            }
        }
    };
}

one_of!(OneOf1 { 0 => V0(A) });
one_of!(OneOf2 { 0 => V0(A), 1 => V1(B) });
one_of!(OneOf3 { 0 => V0(A), 1 => V1(B), 2 => V2(C) });
one_of!(OneOf4 { 0 => V0(A), 1 => V1(B), 2 => V2(C), 3 => V3(D) });
one_of!(OneOf5 { 0 => V0(A), 1 => V1(B), 2 => V2(C), 3 => V3(D), 4 => V4(E) });
one_of!(OneOf6 { 0 => V0(A), 1 => V1(B), 2 => V2(C), 3 => V3(D), 4 => V4(E), 5 => V5(F) });
one_of!(OneOf7 {
    0 => V0(A), 1 => V1(B), 2 => V2(C), 3 => V3(D), 4 => V4(E), 5 => V5(F), 6 => V6(G)
});
one_of!(OneOf8 {
    0 => V0(A), 1 => V1(B), 2 => V2(C), 3 => V3(D), 4 => V4(E), 5 => V5(F), 6 => V6(G),
    7 => V7(H)
});

impl_operands!(1, OneOf1 { 0 => V0(A, a) });
impl_operands!(2, OneOf2 { 0 => V0(A, a), 1 => V1(B, b) });
impl_operands!(3, OneOf3 { 0 => V0(A, a), 1 => V1(B, b), 2 => V2(C, c) });
impl_operands!(4, OneOf4 { 0 => V0(A, a), 1 => V1(B, b), 2 => V2(C, c), 3 => V3(D, d) });
impl_operands!(5, OneOf5 {
    0 => V0(A, a), 1 => V1(B, b), 2 => V2(C, c), 3 => V3(D, d), 4 => V4(E, e)
});
impl_operands!(6, OneOf6 {
    0 => V0(A, a), 1 => V1(B, b), 2 => V2(C, c), 3 => V3(D, d), 4 => V4(E, e), 5 => V5(F, f)
});
impl_operands!(7, OneOf7 {
    0 => V0(A, a), 1 => V1(B, b), 2 => V2(C, c), 3 => V3(D, d), 4 => V4(E, e), 5 => V5(F, f),
    6 => V6(G, g)
});
impl_operands!(8, OneOf8 {
    0 => V0(A, a), 1 => V1(B, b), 2 => V2(C, c), 3 => V3(D, d), 4 => V4(E, e), 5 => V5(F, f),
    6 => V6(G, g), 7 => V7(H, h)
});

impl<T> OneOf1<T> {
    pub fn into_inner(self) -> T {
        match self {
            OneOf1::V0(value) => value,
        }
    }
}

impl<A, B> From<OneOf2<A, B>> for Either<A, B> {
    fn from(value: OneOf2<A, B>) -> Self {
        match value {
            OneOf2::V0(a) => Either::Left(a),
            OneOf2::V1(b) => Either::Right(b),
        }
    }
}

impl<A, B> OneOf2<A, B> {
    pub fn into_either(self) -> Either<A, B> {
        self.into()
    }
}

/// A runtime-sized, homogeneous operand set built from an iterator.
///
/// Created by [`when_all_iter`](crate::join::when_all_iter) and
/// [`when_any_iter`](crate::join::when_any_iter).
#[derive(Debug)]
pub struct Many<F>(Vec<F>);

impl<F> Many<F> {
    pub(crate) fn new(operands: Vec<F>) -> Self {
        Self(operands)
    }
}

impl<F> sealed::Sealed for Many<F> {}

impl<F> Operands for Many<F>
where
    F: IntoFuture,
    F::IntoFuture: 'static,
    F::Output: 'static,
{
    type Output = Vec<F::Output>;
    type OneOf = (usize, F::Output);
    type Slots = Vec<Slot<F::Output>>;

    fn len(&self) -> usize {
        self.0.len()
    }

    fn into_helpers(self, control: &Control) -> (Helpers, Self::Slots) {
        self.0
            .into_iter()
            .enumerate()
            .map(|(index, operand)| helper(index, operand, control))
            .unzip()
    }

    fn take_all(slots: &Self::Slots) -> Self::Output {
        slots.iter().map(take_slot).collect()
    }

    fn take_one(slots: &Self::Slots, index: usize) -> Self::OneOf {
        (index, take_slot(&slots[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_of_index() {
        assert_eq!(OneOf3::<u8, u8, u8>::V2(1).index(), 2);
        assert_eq!(OneOf8::<(), (), (), (), (), (), (), u8>::V7(9).index(), 7);
        assert_eq!(OneOf1::<&str>::V0("x").into_inner(), "x");
    }

    #[test]
    fn test_one_of_two_into_either() {
        let left: Either<u8, &str> = OneOf2::V0(1).into();
        assert_eq!(left, Either::Left(1));
        assert_eq!(OneOf2::<u8, &str>::V1("b").into_either(), Either::Right("b"));
    }
}
