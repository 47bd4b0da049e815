//! Host platform detection, exposed to scripts through the `context` table.

pub mod arch;
pub mod os;

pub use arch::Arch;
pub use os::Os;

use std::fmt;

/// Architecture and OS of the machine running the build (e.g. "x86_64-linux").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub arch: Arch,
  pub os: Os,
}

impl Platform {
  pub fn new(arch: Arch, os: Os) -> Self {
    Self { arch, os }
  }

  pub fn current() -> Self {
    Self {
      arch: Arch::current(),
      os: Os::current(),
    }
  }

  /// Returns the platform triple string (e.g., "aarch64-macos")
  pub fn triple(&self) -> String {
    format!("{}-{}", self.arch, self.os)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.triple())
  }
}
