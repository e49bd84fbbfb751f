/*
 * x86_64 context switch
 *
 * A standard callee-saved-register switch: `switch_context` pushes the six
 * System V callee-saved registers, stashes `rsp` into `*from_sp` (skipped
 * when null), loads `rsp` from `to_sp`, and pops the same six registers
 * before `ret`-ing into whatever address sits above them on the target
 * stack. `stack_init` builds a synthetic frame with that exact shape so the
 * very first switch into a task "returns" into a small trampoline instead
 * of a real caller.
 */

use core::arch::naked_asm;

use crate::arch::Arch;

pub struct X86Arch;

impl Arch for X86Arch {
    fn stack_init(stack: &mut [u8], entry: extern "C" fn(usize) -> !, arg: usize) -> usize {
        let top = (stack.as_mut_ptr() as usize + stack.len()) & !0xf;

        // SAFETY: `top` lies within `stack` and every write below decrements
        // by a full pointer width, staying inside the slice.
        unsafe {
            let mut sp = top;

            sp -= 8;
            *(sp as *mut u64) = arg as u64;
            sp -= 8;
            *(sp as *mut u64) = entry as usize as u64;
            sp -= 8;
            *(sp as *mut u64) = task_entry_trampoline as usize as u64;

            // Callee-saved registers `switch_context` will pop on first
            // dispatch. Their value is irrelevant; the task has never run.
            for _ in 0..6 {
                sp -= 8;
                *(sp as *mut u64) = 0;
            }

            sp
        }
    }

    unsafe fn context_switch(from_sp: *mut usize, to_sp: usize) {
        unsafe { switch_context(from_sp, to_sp) }
    }
}

/// Entered via `ret` out of `switch_context` the first time a freshly
/// created task is dispatched. The two words `stack_init` placed above the
/// synthetic callee-saved frame are still on the stack at this point.
#[unsafe(naked)]
extern "C" fn task_entry_trampoline() -> ! {
    naked_asm!(
        "pop rax", // entry fn pointer
        "pop rdi", // argument, passed per the System V calling convention
        "call rax",
        "ud2", // entry never returns
    )
}

/// Save the current callee-saved registers and stack pointer into
/// `*from_sp` (if non-null), then load `rsp` from `to_sp` and resume there.
///
/// `from_sp: *mut usize` arrives in `rdi`, `to_sp: usize` in `rsi`, per the
/// System V AMD64 calling convention.
#[unsafe(naked)]
unsafe extern "C" fn switch_context(from_sp: *mut usize, to_sp: usize) {
    naked_asm!(
        "push rbp",
        "push rbx",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        "test rdi, rdi",
        "jz 2f",
        "mov [rdi], rsp",
        "2:",
        "mov rsp, rsi",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop rbx",
        "pop rbp",
        "ret",
    )
}
