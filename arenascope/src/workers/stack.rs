//! Thread stack and thread ID queries
//!
//! Thin wrappers over `pthread_getattr_np` and `gettid`, returning integer
//! bounds only.

#![allow(unsafe_code)] // pthread attribute queries require unsafe

use std::io;
use std::mem::MaybeUninit;
use std::ptr;

use crate::domain::{Address, Interval, Tid};

/// Stack range of the calling thread, lowest address first
///
/// # Errors
/// Returns the OS error reported by `pthread_getattr_np` or
/// `pthread_attr_getstack`
pub fn current_thread_stack() -> io::Result<Interval> {
    let mut attr = MaybeUninit::<libc::pthread_attr_t>::uninit();

    // SAFETY: pthread_self() is always valid for the calling thread and `attr`
    // points to writable storage for one pthread_attr_t.
    let ret = unsafe { libc::pthread_getattr_np(libc::pthread_self(), attr.as_mut_ptr()) };
    if ret != 0 {
        return Err(io::Error::from_raw_os_error(ret));
    }

    // SAFETY: pthread_getattr_np succeeded, so `attr` is initialized.
    let mut attr = unsafe { attr.assume_init() };

    let mut stack_addr: *mut libc::c_void = ptr::null_mut();
    let mut stack_size: libc::size_t = 0;

    // SAFETY: `attr` is initialized and both out-pointers are valid.
    let ret = unsafe { libc::pthread_attr_getstack(&attr, &mut stack_addr, &mut stack_size) };

    // SAFETY: `attr` was initialized by pthread_getattr_np and is destroyed once.
    unsafe { libc::pthread_attr_destroy(&mut attr) };

    if ret != 0 {
        return Err(io::Error::from_raw_os_error(ret));
    }

    Ok(Interval::from_start_len(Address::from_ptr(stack_addr.cast_const()), stack_size as u64))
}

/// Kernel thread ID of the calling thread
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn current_tid() -> Tid {
    // SAFETY: SYS_gettid takes no arguments and cannot fail.
    let tid = unsafe { libc::syscall(libc::SYS_gettid) };
    Tid(tid as i32)
}
