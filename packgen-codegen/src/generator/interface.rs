//! Enum bodies, encoded as `[discriminator, payload]`.

use super::family::{local, Access, Family};
use super::node::{NodeEmitter, Outer};
use super::Bodies;
use crate::error::GenerateError;
use crate::graph::{Decl, DeclKind, Variant};
use proc_macro2::{Ident, Literal, TokenStream};
use quote::quote;

type Emitted = Result<TokenStream, GenerateError>;

pub(crate) struct InterfaceEmitter<'e, 'a> {
    node: &'e NodeEmitter<'a>,
    variants: Vec<(&'a Variant, Ident)>,
}

impl<'e, 'a> InterfaceEmitter<'e, 'a> {
    pub fn new(node: &'e NodeEmitter<'a>, decl: &'a Decl) -> Result<Self, GenerateError> {
        let DeclKind::Interface { variants } = &decl.kind else {
            return Err(GenerateError::new(&decl.name, "not an enum"));
        };
        let variants = variants
            .iter()
            .map(|v| {
                syn::parse_str::<Ident>(&v.ident)
                    .map(|ident| (v, ident))
                    .map_err(|e| GenerateError::new(&decl.name, format!("`{}` is not a variant: {e}", v.ident)))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { node, variants })
    }

    pub fn bodies(&self) -> Result<Bodies, GenerateError> {
        Ok(Bodies {
            encode: self.encode(Family::Encode)?,
            marshal: self.encode(Family::Marshal)?,
            decode: self.decode(Family::Decode)?,
            unmarshal: self.decode(Family::Unmarshal)?,
            size: self.size()?,
            is_default: quote!(false),
        })
    }

    fn encode(&self, fam: Family) -> Emitted {
        let rt = self.node.rt;
        let payload = local("p", 0);
        let mut arms = Vec::new();
        for (variant, ident) in &self.variants {
            if variant.skip {
                let name = &variant.ident;
                arms.push(quote! {
                    Self::#ident { .. } => {
                        return Err(#rt::Error::unknown_variant(#name));
                    }
                });
                continue;
            }
            let header = fam.write(rt, "array_header", quote!(2));
            let key = discriminator(&variant.key);
            let key = fam.write_raw(quote!(#key));
            let arm = match &variant.payload {
                None => {
                    let nil = fam.write(rt, "nil", quote!());
                    quote! {
                        Self::#ident => {
                            #header
                            #key
                            #nil
                        }
                    }
                }
                Some(node) => {
                    let name = &variant.key;
                    let path = [quote!(#rt::PathSegment::Field(#name))];
                    let body = self.node.encode(
                        fam,
                        node,
                        &Access::binding(payload.clone()),
                        &path,
                        Outer::default(),
                        1,
                    )?;
                    quote! {
                        Self::#ident(#payload) => {
                            #header
                            #key
                            #body
                        }
                    }
                }
            };
            arms.push(arm);
        }
        Ok(quote! {
            match self {
                #(#arms)*
            }
        })
    }

    fn decode(&self, fam: Family) -> Emitted {
        let rt = self.node.rt;
        let payload = local("p", 0);
        let header = fam.read(rt, "read_array_header");
        let (read_key, scrutinee) = match fam {
            Family::Decode => (fam.read(rt, "read_map_key"), quote!(__key.as_str())),
            _ => (fam.read(rt, "read_map_key_ref"), quote!(__key)),
        };
        let skip = fam.read(rt, "skip");
        let mut arms = Vec::new();
        for (variant, ident) in self.variants.iter().filter(|(v, _)| !v.skip) {
            let key = &variant.key;
            let arm = match &variant.payload {
                None => quote! {
                    #key => {
                        #skip?;
                        *self = Self::#ident;
                    }
                },
                Some(node) => {
                    let path = [quote!(#rt::PathSegment::Field(#key))];
                    let body = self.node.decode(
                        fam,
                        node,
                        &Access::binding(payload.clone()),
                        &path,
                        Outer::default(),
                        1,
                    )?;
                    quote! {
                        #key => {
                            if !matches!(self, Self::#ident(_)) {
                                *self = Self::#ident(Default::default());
                            }
                            if let Self::#ident(#payload) = self {
                                #body
                            }
                        }
                    }
                }
            };
            arms.push(arm);
        }
        Ok(quote! {
            let __n = #header?;
            if __n != 2 {
                return Err(#rt::Error::arity(2, __n));
            }
            let __key = #read_key?;
            match #scrutinee {
                #(#arms)*
                __other => {
                    return Err(#rt::Error::unknown_variant(__other));
                }
            }
        })
    }

    fn size(&self) -> Emitted {
        let rt = self.node.rt;
        let payload = local("p", 0);
        let mut arms = Vec::new();
        for (variant, ident) in &self.variants {
            let key_len = Literal::usize_unsuffixed(encoded_key(&variant.key).len());
            let arm = match (&variant.payload, variant.skip) {
                (_, true) => quote!(Self::#ident { .. } => 0,),
                (None, false) => quote!(Self::#ident => #key_len + #rt::size::NIL,),
                (Some(node), false) => {
                    let size = self.node.size(node, &Access::binding(payload.clone()), Outer::default(), 1)?;
                    quote!(Self::#ident(#payload) => #key_len + #size,)
                }
            };
            arms.push(arm);
        }
        Ok(quote! {
            #rt::size::ARRAY_HEADER + match self {
                #(#arms)*
            }
        })
    }
}

fn encoded_key(key: &str) -> Vec<u8> {
    let mut out = Vec::new();
    packgen::append::append_str(&mut out, key);
    out
}

fn discriminator(key: &str) -> Literal {
    Literal::byte_string(&encoded_key(key))
}
