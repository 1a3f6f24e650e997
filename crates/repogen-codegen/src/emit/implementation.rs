// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Implementation emission.
//!
//! One concrete struct per repository, `<Trait>Impl<S>`, generic over the
//! session facade and implementing three surfaces: the base
//! `CrudRepository`, the user's trait (signatures re-emitted verbatim), and
//! the derived extension trait. Method bodies are direct calls into the
//! five session operations; the trait bound on `S` brings them into scope
//! without imports.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use super::{GeneratedFile, bound_params, hint_name, render, signature_tokens};
use crate::{
    diagnostics::DiagnosticSink,
    model::{last_segment, UserMethod},
    planner::{
        DerivedMethod, EntityBinding, PlanBody, RepositoryPlan, UserBody, UserCall
    }
};

/// Emit `<repo>_impl.g.rs` for one plan.
pub fn emit_implementation(plan: &RepositoryPlan, sink: &DiagnosticSink) -> Option<GeneratedFile> {
    let user_trait = format_ident!("{}", plan.repository.trait_name);
    let ext_trait = format_ident!("{}Ext", plan.repository.trait_name);
    let impl_name = format_ident!("{}Impl", plan.repository.trait_name);
    let entity_ident = format_ident!("{}", plan.entity.simple_name);
    let key_ty = &plan.repository.key_type;

    let base_methods: Vec<TokenStream> = plan
        .base_methods
        .iter()
        .map(|method| derived_method_tokens(method, &entity_ident))
        .collect();
    let user_methods: Vec<TokenStream> = plan
        .user_methods
        .iter()
        .map(|planned| user_method_tokens(&planned.method, &planned.body))
        .collect();
    let derived_methods: Vec<TokenStream> = plan
        .derived
        .iter()
        .map(|method| derived_method_tokens(method, &entity_ident))
        .collect();

    let struct_doc = format!(
        "Generated implementation of [`{}`] over a session facade.",
        plan.repository.trait_name
    );
    let tokens = quote! {
        #[doc = #struct_doc]
        pub struct #impl_name<S> {
            session: S,
        }

        impl<S> #impl_name<S> {
            /// Wrap a session.
            pub fn new(session: S) -> Self {
                Self { session }
            }

            /// Access the underlying session.
            pub fn session(&self) -> &S {
                &self.session
            }
        }

        #[repogen_core::async_trait]
        impl<S: repogen_core::SqlSession> repogen_core::CrudRepository<#entity_ident, #key_ty>
            for #impl_name<S>
        {
            #(#base_methods)*
        }

        #[repogen_core::async_trait]
        impl<S: repogen_core::SqlSession> #user_trait for #impl_name<S> {
            #(#user_methods)*
        }

        #[repogen_core::async_trait]
        impl<S: repogen_core::SqlSession> #ext_trait for #impl_name<S> {
            #(#derived_methods)*
        }
    };

    let source_text = render(tokens, &plan.repository.trait_name, sink)?;
    Some(GeneratedFile {
        hint_name: hint_name(&plan.repository.trait_name, "impl"),
        source_text
    })
}

/// Entity-field parameter expressions for insert/update/bulk bindings.
fn binding_exprs(bindings: &[EntityBinding], receiver: &proc_macro2::Ident) -> Vec<TokenStream> {
    bindings
        .iter()
        .map(|binding| {
            let name = &binding.param;
            let field = format_ident!("{}", binding.field);
            if binding.clone {
                quote!(repogen_core::SqlParam::new(#name, #receiver.#field.clone()))
            } else {
                quote!(repogen_core::SqlParam::new(#name, #receiver.#field))
            }
        })
        .collect()
}

/// A planned method rendered as `async fn … { … }`.
fn derived_method_tokens(
    method: &DerivedMethod,
    entity_ident: &proc_macro2::Ident
) -> TokenStream {
    let signature = signature_tokens(method, entity_ident);
    let params = bound_params(&method.params);

    let body = match &method.body {
        PlanBody::Query { sql } => quote! {
            self.session.query::<#entity_ident>(#sql, #params).await
        },
        PlanBody::QueryTarget { sql, ty } => quote! {
            self.session.query::<#ty>(#sql, #params).await
        },
        PlanBody::QuerySingle { sql } => quote! {
            self.session.query_single::<#entity_ident>(#sql, #params).await
        },
        PlanBody::Count { sql } => quote! {
            self.session.execute_scalar::<i64>(#sql, #params).await
        },
        PlanBody::Exists { sql } => quote! {
            let count = self.session.execute_scalar::<i64>(#sql, #params).await?;
            Ok(count > 0)
        },
        PlanBody::Scalar { sql } => {
            let ty = scalar_type(&method.ret);
            quote! {
                self.session.execute_scalar::<#ty>(#sql, #params).await
            }
        }
        PlanBody::OptionalScalar { sql } => {
            let ty = scalar_type(&method.ret);
            quote! {
                self.session.execute_scalar::<Option<#ty>>(#sql, #params).await
            }
        }
        PlanBody::Execute { sql } => quote! {
            self.session.execute(#sql, #params).await
        },
        PlanBody::Insert {
            sql,
            generated_key,
            bindings
        } => {
            let exprs = binding_exprs(bindings, &format_ident!("entity"));
            match generated_key {
                Some((property, key_ty)) => {
                    let pk = format_ident!("{}", property);
                    quote! {
                        let mut entity = entity;
                        let id = self
                            .session
                            .execute_scalar::<#key_ty>(#sql, &[#(#exprs),*])
                            .await?;
                        entity.#pk = id;
                        Ok(entity)
                    }
                }
                None => quote! {
                    self.session.execute(#sql, &[#(#exprs),*]).await?;
                    Ok(entity)
                }
            }
        }
        PlanBody::UpdateEntity {
            sql,
            bindings
        } => {
            let exprs = binding_exprs(bindings, &format_ident!("entity"));
            quote! {
                self.session.execute(#sql, &[#(#exprs),*]).await
            }
        }
        PlanBody::SortedPage {
            sql_prefix
        } => {
            // The metadata record is the injection guard: an unknown
            // `order_by` resolves to the key column, never to raw text.
            quote! {
                let metadata =
                    repogen_core::MetadataProvider::get::<#entity_ident>(&GeneratedMetadataProvider)
                        .ok_or_else(|| {
                            repogen_core::SessionError::backend("entity metadata missing")
                        })?;
                let column = metadata.order_column(order_by.as_deref().unwrap_or(""));
                let direction = if ascending { "ASC" } else { "DESC" };
                let sql = format!(
                    "{} ORDER BY {} {} OFFSET @skip ROWS FETCH NEXT @take ROWS ONLY",
                    #sql_prefix, column, direction
                );
                self.session.query::<#entity_ident>(&sql, #params).await
            }
        }
        PlanBody::GroupMap { sql } => {
            let (key, value) = map_types(&method.ret);
            quote! {
                let rows = self
                    .session
                    .query::<repogen_core::GroupRow<#key, #value>>(#sql, #params)
                    .await?;
                Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
            }
        }
        PlanBody::Rows {
            sql,
            struct_name
        } => {
            let ident = format_ident!("{}", struct_name);
            quote! {
                self.session.query::<#ident>(#sql, #params).await
            }
        }
    };

    quote! {
        #signature {
            #body
        }
    }
}

fn scalar_type(ret: &crate::planner::PlanReturn) -> syn::Type {
    match ret {
        crate::planner::PlanReturn::Scalar(ty)
        | crate::planner::PlanReturn::OptionalScalar(ty) => ty.clone(),
        _ => syn::parse_quote!(i64)
    }
}

fn map_types(ret: &crate::planner::PlanReturn) -> (syn::Type, syn::Type) {
    match ret {
        crate::planner::PlanReturn::Map {
            key,
            value
        } => (key.clone(), value.clone()),
        _ => (syn::parse_quote!(i64), syn::parse_quote!(i64))
    }
}

fn is_result_wrapped(method: &UserMethod) -> bool {
    match &method.signature.output {
        syn::ReturnType::Type(_, ty) => matches!(
            last_segment(ty).as_deref(),
            Some("Result") | Some("RepoResult")
        ),
        syn::ReturnType::Default => false
    }
}

/// A user method rendered with its declared signature, verbatim.
fn user_method_tokens(method: &UserMethod, body: &UserBody) -> TokenStream {
    let signature = &method.signature;
    let body = match body {
        UserBody::Sql {
            sql,
            call
        } => {
            let entries: Vec<TokenStream> = method
                .params
                .iter()
                .map(|param| {
                    let name = &param.name;
                    let ident = format_ident!("{}", param.name);
                    quote!(repogen_core::SqlParam::new(#name, #ident))
                })
                .collect();
            let params = quote!(&[#(#entries),*]);
            match call {
                UserCall::Query(ty) => quote! {
                    self.session.query::<#ty>(#sql, #params).await
                },
                UserCall::QuerySingle(ty) => quote! {
                    self.session.query_single::<#ty>(#sql, #params).await
                },
                UserCall::One(ty) => quote! {
                    let row = self.session.query_single::<#ty>(#sql, #params).await?;
                    row.ok_or_else(|| repogen_core::SessionError::backend("query returned no rows"))
                },
                UserCall::Execute => quote! {
                    self.session.execute(#sql, #params).await
                },
                UserCall::Exists => quote! {
                    let count = self.session.execute_scalar::<i64>(#sql, #params).await?;
                    Ok(count > 0)
                },
                UserCall::Scalar(ty) => quote! {
                    self.session.execute_scalar::<#ty>(#sql, #params).await
                },
                UserCall::Unit => quote! {
                    self.session.execute(#sql, #params).await?;
                    Ok(())
                }
            }
        }
        UserBody::Bulk {
            sql,
            batch_size,
            use_transaction,
            items_param,
            bindings
        } => {
            let items = format_ident!("{}", items_param);
            let batch = *batch_size as usize;
            let exprs = binding_exprs(bindings, &format_ident!("item"));
            let (open, commit) = if *use_transaction {
                (
                    quote!(let transaction = self.session.open_transaction().await?;),
                    quote!(repogen_core::SqlTransaction::commit(transaction).await?;)
                )
            } else {
                (quote!(), quote!())
            };
            let tail = match &method.return_shape {
                crate::model::ReturnShape::Unit => quote! {
                    let _ = affected;
                    Ok(())
                },
                _ => quote!(Ok(affected))
            };
            quote! {
                let mut affected = 0u64;
                #open
                for chunk in #items.chunks(#batch) {
                    for item in chunk {
                        affected += self.session.execute(#sql, &[#(#exprs),*]).await?;
                    }
                }
                #commit
                #tail
            }
        }
        UserBody::Guarded {
            message
        } => {
            // Parameters are consumed so the guarded body lints clean.
            let idents: Vec<proc_macro2::Ident> = method
                .params
                .iter()
                .map(|param| format_ident!("{}", param.name))
                .collect();
            let consume = if idents.is_empty() {
                quote!()
            } else {
                quote!(let _ = (#(#idents),*);)
            };
            if is_result_wrapped(method) {
                quote! {
                    #consume
                    Err(repogen_core::SessionError::QueryTranslation(
                        #message.to_owned()
                    ))
                }
            } else {
                quote! {
                    #consume
                    panic!("{}", #message)
                }
            }
        }
    };

    quote! {
        #signature {
            #body
        }
    }
}
