//! List commands implementation

use crate::programmers;

/// List all programmers compiled into this build
pub fn list_programmers() {
    println!("Supported programmers:");
    println!();
    print!("{}", programmers::programmer_help());
}
