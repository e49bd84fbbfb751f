/*
 * x86_64 architecture support
 *
 * Implements the two hardware-facing contracts the kernel core depends on:
 * the critical-section primitive (`critical`) and the context-switch hook
 * (`context`). GDT/IDT setup, PIC programming, and driver interrupt
 * dispatch are board-support concerns and are not part of this crate.
 */

pub mod context;
pub mod critical;
