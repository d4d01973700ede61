//! Struct and newtype bodies.

use super::family::{Access, Family};
use super::node::{NodeEmitter, Outer};
use super::Bodies;
use crate::error::GenerateError;
use crate::graph::{Decl, DeclKind, Field};
use crate::resolver::{EmptinessPolicy, Layout, ResolvedField, ResolvedType};
use proc_macro2::{Literal, TokenStream};
use quote::quote;

type Emitted = Result<TokenStream, GenerateError>;

/// One field that takes part in generated code.
struct Planned<'a> {
    field: &'a Field,
    resolved: &'a ResolvedField,
    place: Access,
    /// Wire key pre-encoded as a msgpack str.
    key_bytes: Vec<u8>,
    /// Slot in the omission mask.
    bit: Option<usize>,
    /// Another field later in declaration order carries the same key.
    shadowed: bool,
}

impl Planned<'_> {
    fn outer(&self) -> Outer {
        Outer {
            limit: self.resolved.limit,
            allownil: self.resolved.allownil,
        }
    }

    fn key_literal(&self) -> Literal {
        Literal::byte_string(&self.key_bytes)
    }
}

pub(crate) struct StructEmitter<'e, 'a> {
    node: &'e NodeEmitter<'a>,
    layout: Layout,
    fields: Vec<Planned<'a>>,
}

impl<'e, 'a> StructEmitter<'e, 'a> {
    pub fn new(node: &'e NodeEmitter<'a>, decl: &'a Decl, resolved: &'a ResolvedType) -> Result<Self, GenerateError> {
        let Some(st) = decl.as_struct() else {
            return Err(GenerateError::new(&decl.name, "not a struct"));
        };
        let mut fields = Vec::new();
        let mut bits = 0;
        for rf in resolved.fields.iter().filter(|f| f.skip.is_none()) {
            let field = st
                .fields
                .get(rf.index)
                .ok_or_else(|| GenerateError::new(&decl.name, format!("no field at index {}", rf.index)))?;
            let bit = if resolved.layout == Layout::Map && rf.policy.omits() {
                bits += 1;
                Some(bits - 1)
            } else {
                None
            };
            let mut key_bytes = Vec::new();
            packgen::append::append_str(&mut key_bytes, &rf.key);
            fields.push(Planned {
                field,
                resolved: rf,
                place: Access::place(member_path(&decl.name, &field.access)?),
                key_bytes,
                bit,
                shadowed: false,
            });
        }
        for i in 0..fields.len() {
            let key = &fields[i].resolved.key;
            fields[i].shadowed = fields[i + 1..].iter().any(|later| &later.resolved.key == key);
        }
        Ok(Self {
            node,
            layout: resolved.layout,
            fields,
        })
    }

    pub fn bodies(&self) -> Result<Bodies, GenerateError> {
        Ok(Bodies {
            encode: self.encode(Family::Encode)?,
            marshal: self.encode(Family::Marshal)?,
            decode: self.decode(Family::Decode)?,
            unmarshal: self.decode(Family::Unmarshal)?,
            size: self.size()?,
            is_default: self.is_default(),
        })
    }

    fn count(&self) -> Result<Literal, GenerateError> {
        let n = u32::try_from(self.fields.len())
            .map_err(|_| GenerateError::new(self.node.owner, "too many fields"))?;
        Ok(Literal::u32_unsuffixed(n))
    }

    fn omit_test(&self, f: &Planned<'_>) -> TokenStream {
        match f.resolved.policy {
            EmptinessPolicy::Always => quote!(false),
            EmptinessPolicy::OmitIfDefaultBitPattern => {
                self.node.is_zero(&f.field.node, &f.place, f.resolved.allownil, 0)
            }
            EmptinessPolicy::OmitIfCustomZero => self.node.custom_test(&f.field.node, &f.place, false, 0),
            EmptinessPolicy::OmitIfCustomEmpty => self.node.custom_test(&f.field.node, &f.place, true, 0),
        }
    }

    fn encode(&self, fam: Family) -> Emitted {
        let rt = self.node.rt;
        let n = self.count()?;
        let mut out = TokenStream::new();
        let mut writes = Vec::with_capacity(self.fields.len());
        for f in &self.fields {
            let key = &f.resolved.key;
            let path = [quote!(#rt::PathSegment::Field(#key))];
            writes.push(self.node.encode(fam, &f.field.node, &f.place, &path, f.outer(), 0)?);
        }

        if self.layout == Layout::Tuple {
            out.extend(fam.write(rt, "array_header", quote!(#n)));
            out.extend(writes);
            return Ok(out);
        }

        let omittable = self.fields.iter().filter(|f| f.bit.is_some()).count();
        let words = omittable.div_ceil(64);
        if omittable == 0 {
            out.extend(fam.write(rt, "map_header", quote!(#n)));
        } else {
            if words == 1 {
                out.extend(quote!(let mut __omit: u64 = 0;));
            } else {
                let words = Literal::usize_unsuffixed(words);
                out.extend(quote!(let mut __omit = [0u64; #words];));
            }
            for f in &self.fields {
                if let Some(bit) = f.bit {
                    let test = self.omit_test(f);
                    let slot = mask_slot(bit, words);
                    let shift = Literal::usize_unsuffixed(bit % 64);
                    out.extend(quote! {
                        if #test {
                            #slot |= 1u64 << #shift;
                        }
                    });
                }
            }
            if words == 1 {
                out.extend(quote!(let __len = #n - __omit.count_ones();));
            } else {
                out.extend(quote!(let __len = #n - __omit.iter().map(|w| w.count_ones()).sum::<u32>();));
            }
            out.extend(fam.write(rt, "map_header", quote!(__len)));
        }

        for (f, write) in self.fields.iter().zip(writes) {
            let literal = f.key_literal();
            let key = fam.write_raw(quote!(#literal));
            let pair = quote! {
                #key
                #write
            };
            match f.bit {
                Some(bit) => {
                    let slot = mask_slot(bit, words);
                    let shift = Literal::usize_unsuffixed(bit % 64);
                    out.extend(quote! {
                        if #slot & (1u64 << #shift) == 0 {
                            #pair
                        }
                    });
                }
                None => out.extend(pair),
            }
        }
        Ok(out)
    }

    fn decode(&self, fam: Family) -> Emitted {
        let rt = self.node.rt;
        if self.layout == Layout::Tuple {
            let n = self.count()?;
            let header = fam.read(rt, "read_array_header");
            let mut out = quote! {
                let __n = #header?;
                if __n != #n {
                    return Err(#rt::Error::arity(#n, __n));
                }
            };
            for f in &self.fields {
                out.extend(self.decode_field(fam, f)?);
            }
            return Ok(out);
        }

        let header = fam.read(rt, "read_map_header");
        let (read_key, scrutinee) = match fam {
            Family::Decode => (fam.read(rt, "read_map_key"), quote!(__key.as_str())),
            _ => (fam.read(rt, "read_map_key_ref"), quote!(__key)),
        };
        let skip = fam.read(rt, "skip");
        let mut arms = Vec::new();
        for f in self.fields.iter().filter(|f| !f.shadowed) {
            let key = &f.resolved.key;
            let body = self.decode_field(fam, f)?;
            arms.push(quote!(#key => { #body }));
        }
        Ok(quote! {
            let __n = #header?;
            for _ in 0..__n {
                let __key = #read_key?;
                match #scrutinee {
                    #(#arms)*
                    _ => {
                        #skip?;
                    }
                }
            }
        })
    }

    fn decode_field(&self, fam: Family, f: &Planned<'_>) -> Emitted {
        let rt = self.node.rt;
        let key = &f.resolved.key;
        let path = [quote!(#rt::PathSegment::Field(#key))];
        self.node.decode(fam, &f.field.node, &f.place, &path, f.outer(), 0)
    }

    fn size(&self) -> Emitted {
        let rt = self.node.rt;
        let mut terms = vec![match self.layout {
            Layout::Map => quote!(#rt::size::MAP_HEADER),
            Layout::Tuple => quote!(#rt::size::ARRAY_HEADER),
        }];
        for f in &self.fields {
            if self.layout == Layout::Map {
                let len = Literal::usize_unsuffixed(f.key_bytes.len());
                terms.push(quote!(#len));
            }
            terms.push(self.node.size(&f.field.node, &f.place, f.outer(), 0)?);
        }
        Ok(quote!(#(#terms)+*))
    }

    fn is_default(&self) -> TokenStream {
        if self.fields.is_empty() {
            return quote!(true);
        }
        let tests = self
            .fields
            .iter()
            .map(|f| self.node.is_zero(&f.field.node, &f.place, f.resolved.allownil, 0));
        quote!(#(#tests)&&*)
    }
}

/// Bodies for a single-field tuple struct, transparent over `self.0`.
pub(crate) fn newtype_bodies(
    node: &NodeEmitter<'_>,
    decl: &Decl,
    resolved: &ResolvedType,
) -> Result<Bodies, GenerateError> {
    let DeclKind::Identifier { underlying, .. } = &decl.kind else {
        return Err(GenerateError::new(&decl.name, "not a newtype"));
    };
    let outer = resolved
        .fields
        .first()
        .map(|f| Outer {
            limit: f.limit,
            allownil: f.allownil,
        })
        .unwrap_or_default();
    let place = Access::place(quote!(self.0));
    Ok(Bodies {
        encode: node.encode(Family::Encode, underlying, &place, &[], outer, 0)?,
        marshal: node.encode(Family::Marshal, underlying, &place, &[], outer, 0)?,
        decode: node.decode(Family::Decode, underlying, &place, &[], outer, 0)?,
        unmarshal: node.decode(Family::Unmarshal, underlying, &place, &[], outer, 0)?,
        size: node.size(underlying, &place, outer, 0)?,
        is_default: node.is_zero(underlying, &place, outer.allownil, 0),
    })
}

/// `self.a.b` from a field's member path.
fn member_path(owner: &str, access: &[String]) -> Emitted {
    let members = access
        .iter()
        .map(|m| {
            syn::parse_str::<syn::Member>(m)
                .map_err(|e| GenerateError::new(owner, format!("`{m}` is not a member: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(quote!(self #(.#members)*))
}

/// The mask word holding `bit`.
fn mask_slot(bit: usize, words: usize) -> TokenStream {
    if words <= 1 {
        quote!(__omit)
    } else {
        let word = Literal::usize_unsuffixed(bit / 64);
        quote!(__omit[#word])
    }
}
