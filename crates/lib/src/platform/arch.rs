use std::fmt;

/// CPU architecture a build script runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86,
  X86_64,
  Arm,
  Aarch64,
  Other,
}

impl Arch {
  pub fn current() -> Self {
    match std::env::consts::ARCH {
      "x86" => Self::X86,
      "x86_64" => Self::X86_64,
      "arm" => Self::Arm,
      "aarch64" => Self::Aarch64,
      _ => Self::Other,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86 => "x86",
      Self::X86_64 => "x86_64",
      Self::Arm => "arm",
      Self::Aarch64 => "aarch64",
      Self::Other => "unknown",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
