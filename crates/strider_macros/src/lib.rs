use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::quote;
use syn::{parse_macro_input, FnArg, ItemFn, LitInt, Pat, Signature};

/// Time a simulation system when the `perf_stats` feature is enabled.
///
/// The body is wrapped in a drop guard that reports the elapsed time through
/// bevy's `info!` once the system returns. Without `perf_stats` the guard is
/// compiled out entirely.
///
/// If the system takes a `Res<SimTick>` parameter (under any name), the tick
/// number is included in the report and a line is also written every 100
/// ticks regardless of cost, so slow drifts show up in the log.
///
/// ```ignore
/// #[profile]
/// pub fn update_units(mut field: ResMut<Battlefield>, tick: Res<SimTick>) {
///     // ...
/// }
///
/// #[profile(4)] // only report runs slower than 4ms
/// pub fn run_ai(/* ... */) {}
/// ```
#[proc_macro_attribute]
pub fn profile(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    let threshold_ms: u128 = if attr.is_empty() {
        1
    } else {
        match syn::parse::<LitInt>(attr) {
            Ok(lit) => lit.base10_parse().unwrap_or(1),
            Err(err) => return err.to_compile_error().into(),
        }
    };

    let attrs = &input.attrs;
    let vis = &input.vis;
    let sig = &input.sig;
    let block = &input.block;
    let name = sig.ident.to_string();

    let guard = match tick_binding(sig) {
        Some(tick) => quote! {
            struct TickCostGuard {
                name: &'static str,
                start: std::time::Instant,
                tick: u64,
            }
            impl Drop for TickCostGuard {
                fn drop(&mut self) {
                    let elapsed = self.start.elapsed();
                    if elapsed.as_millis() > #threshold_ms || self.tick % 100 == 0 {
                        bevy::prelude::info!("[PERF] {} @ tick {}: {:?}", self.name, self.tick, elapsed);
                    }
                }
            }
            TickCostGuard {
                name: #name,
                start: std::time::Instant::now(),
                tick: #tick.0,
            }
        },
        None => quote! {
            struct TickCostGuard {
                name: &'static str,
                start: std::time::Instant,
            }
            impl Drop for TickCostGuard {
                fn drop(&mut self) {
                    let elapsed = self.start.elapsed();
                    if elapsed.as_millis() > #threshold_ms {
                        bevy::prelude::info!("[PERF] {}: {:?}", self.name, elapsed);
                    }
                }
            }
            TickCostGuard {
                name: #name,
                start: std::time::Instant::now(),
            }
        },
    };

    let output = quote! {
        #(#attrs)*
        #vis #sig {
            #[cfg(feature = "perf_stats")]
            let _tick_cost = {
                #guard
            };

            #block
        }
    };

    output.into()
}

/// Finds the parameter bound to `Res<SimTick>`, if any.
fn tick_binding(sig: &Signature) -> Option<Ident> {
    sig.inputs.iter().find_map(|arg| {
        let FnArg::Typed(pat_type) = arg else {
            return None;
        };
        let Pat::Ident(pat_ident) = &*pat_type.pat else {
            return None;
        };
        let ty = &pat_type.ty;
        let ty_str = quote!(#ty).to_string();
        (ty_str.contains("Res") && ty_str.contains("SimTick")).then(|| pat_ident.ident.clone())
    })
}
