//! `keygen` — print a fresh base64-encoded 32-byte field encryption key.
//!
//! Run once and place the output in the `ENCRYPTION_KEY` environment
//! variable. Pure generator: no running system is touched.

fn main() {
    println!("{}", fieldvault::generate_key());
}
