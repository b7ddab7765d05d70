//! # prospector-binding
//!
//! Loads the compiled Prospector core and drives it through the versioned C
//! ABI declared in [`prospector_core::abi`].
//!
//! ```no_run
//! use prospector_binding::NativeModule;
//! use prospector_core::{CoreConfig, Environment};
//!
//! # fn main() -> prospector_core::Result<()> {
//! let module = NativeModule::load_default()?;
//! let mut env = module.create_env(&CoreConfig::default())?;
//! let _obs = env.reset(42)?;
//! let step = env.step(6)?;
//! println!("reward {}", step.reward);
//! # Ok(())
//! # }
//! ```

mod env;
mod module;

pub use env::NativeEnv;
pub use module::{LIBRARY_ENV, NativeModule, default_library_path};
