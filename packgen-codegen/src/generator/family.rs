//! Stream and buffer flavors of the encode and decode families.
//!
//! The streaming and buffer operations share one emitter. A [`Family`]
//! picks which primitive layer each wire operation is spelled against:
//! `Writer`/`Reader` methods for streams, `append`/`bytes` functions for
//! buffers.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

/// One of the four operations that move values across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Family {
    /// `encode_msg` over `w: &mut Writer<W>`.
    Encode,
    /// `marshal_msg` over `buf: &mut Vec<u8>`.
    Marshal,
    /// `decode_msg` over `r: &mut Reader<R>`.
    Decode,
    /// `unmarshal_msg` over the local cursor `bts`.
    Unmarshal,
}

impl Family {
    /// Whether the family consumes from a buffer rather than a stream.
    pub fn is_buffer(self) -> bool {
        matches!(self, Family::Marshal | Family::Unmarshal)
    }

    /// A write statement for a primitive wire operation such as `str` or
    /// `array_header`.
    pub fn write(self, rt: &TokenStream, op: &str, args: TokenStream) -> TokenStream {
        match self {
            Family::Encode => {
                let method = format_ident!("write_{}", op);
                quote!(w.#method(#args)?;)
            }
            _ => {
                let func = format_ident!("append_{}", op);
                // The only appender that can fail.
                if op == "duration" {
                    quote!(#rt::append::#func(buf, #args)?;)
                } else {
                    quote!(#rt::append::#func(buf, #args);)
                }
            }
        }
    }

    /// Writes pre-encoded bytes.
    pub fn write_raw(self, bytes: TokenStream) -> TokenStream {
        match self {
            Family::Encode => quote!(w.write_raw(#bytes)?;),
            _ => quote!(buf.extend_from_slice(#bytes);),
        }
    }

    /// A read expression of type `Result<_>`.
    pub fn read(self, rt: &TokenStream, op: &str) -> TokenStream {
        let method = format_ident!("{}", op);
        match self {
            Family::Decode => quote!(r.#method()),
            _ => quote!(#rt::bytes::#method(&mut bts)),
        }
    }

    /// A read expression taking one extra argument.
    pub fn read_with(self, rt: &TokenStream, op: &str, arg: TokenStream) -> TokenStream {
        let method = format_ident!("{}", op);
        match self {
            Family::Decode => quote!(r.#method(#arg)),
            _ => quote!(#rt::bytes::#method(&mut bts, #arg)),
        }
    }

    /// Delegates to the operation trait of a value's own type.
    ///
    /// `value` is `&T` for writers and `&mut T` for readers; `wrap` is
    /// appended to fallible reads.
    pub fn delegate(self, rt: &TokenStream, value: TokenStream, wrap: &TokenStream) -> TokenStream {
        match self {
            Family::Encode => quote!(#rt::Encodable::encode_msg(#value, w)?;),
            Family::Marshal => quote!(#rt::Marshaler::marshal_msg(#value, buf)?;),
            Family::Decode => quote!(#rt::Decodable::decode_msg(#value, r) #wrap ?;),
            Family::Unmarshal => {
                quote!(bts = #rt::Unmarshaler::unmarshal_msg(#value, bts) #wrap ?;)
            }
        }
    }

    /// Hands a value to an `Interceptor` provider.
    pub fn intercept(
        self,
        rt: &TokenStream,
        provider: &syn::Path,
        value: TokenStream,
        wrap: &TokenStream,
    ) -> TokenStream {
        match self {
            Family::Encode => quote!(#rt::Interceptor::encode(&#provider, #value, w)?;),
            Family::Marshal => quote!(#rt::Interceptor::marshal(&#provider, #value, buf)?;),
            Family::Decode => quote!(#rt::Interceptor::decode(&#provider, #value, r) #wrap ?;),
            Family::Unmarshal => {
                quote!(bts = #rt::Interceptor::unmarshal(&#provider, #value, bts) #wrap ?;)
            }
        }
    }
}

/// How generated code reaches a value.
///
/// A place is a member path such as `self.meta.id`; a binding is a local
/// holding a reference, such as a loop variable.
#[derive(Debug, Clone)]
pub(crate) enum Access {
    Place(TokenStream),
    Binding(Ident),
}

impl Access {
    pub fn place(tokens: TokenStream) -> Self {
        Access::Place(tokens)
    }

    pub fn binding(ident: Ident) -> Self {
        Access::Binding(ident)
    }

    /// Receiver for method calls and member access.
    pub fn recv(&self) -> TokenStream {
        match self {
            Access::Place(t) => t.clone(),
            Access::Binding(i) => quote!(#i),
        }
    }

    /// The value itself, for copies and assignment.
    pub fn deref(&self) -> TokenStream {
        match self {
            Access::Place(t) => t.clone(),
            Access::Binding(i) => quote!(*#i),
        }
    }

    /// A shared reference to the value.
    pub fn by_ref(&self) -> TokenStream {
        match self {
            Access::Place(t) => quote!(&#t),
            Access::Binding(i) => quote!(#i),
        }
    }

    /// An exclusive reference to the value.
    pub fn by_mut(&self) -> TokenStream {
        match self {
            Access::Place(t) => quote!(&mut #t),
            Access::Binding(i) => quote!(#i),
        }
    }

    /// A member of the value, e.g. the `0` of a newtype.
    pub fn member(&self, member: &syn::Member) -> Self {
        let recv = self.recv();
        Access::Place(quote!(#recv.#member))
    }
}

/// A fresh local name for the given nesting depth.
pub(crate) fn local(prefix: &str, depth: usize) -> Ident {
    format_ident!("__{}{}", prefix, depth)
}
