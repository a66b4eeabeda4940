//! Latest-kernel selection

use droplet_client::Kernel;

/// Newest kernel whose name starts with `prefix`.
///
/// Kernels are ordered by the numeric components of their version; when two
/// versions compare equal the one listed last wins.
pub fn latest_kernel<'a>(kernels: &'a [Kernel], prefix: &str) -> Option<&'a Kernel> {
    kernels
        .iter()
        .filter(|k| k.name.starts_with(prefix))
        .max_by_key(|k| k.version_key())
}
