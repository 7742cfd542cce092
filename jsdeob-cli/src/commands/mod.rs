pub mod deobfuscate;
