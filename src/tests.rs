use std::{cell::Cell, cell::RefCell, ptr::NonNull};

use crate::{
    ledger::*,
    observed::*,
    pointers::*,
    raw_ref::RawRef,
    tracking::RefCountBlock,
};

struct DropIncrementer(&'static Cell<i32>);
impl Drop for DropIncrementer
{
    fn drop(&mut self) { self.0.set(self.0.get() + 1); }
}

fn drop_cell() -> &'static Cell<i32> { Box::leak(Box::new(Cell::new(0))) }

fn assert_balanced(before: Stats)
{
    let after = thread_local_stats();
    assert_eq!(after.net_values(), before.net_values());
    assert_eq!(after.net_counters(), before.net_counters());
}

#[test]
fn shared_copies_count_owners()
{
    let before = thread_local_stats();
    let cell = drop_cell();

    let h1 = Shared::new(DropIncrementer(cell));
    let h2 = h1.clone();

    assert_eq!(h1.count(), 2u64);
    assert_eq!(h2.count(), 2u64);
    assert!(h1 == h2);

    std::mem::drop(h1);

    assert_eq!(h2.count(), 1u64);
    assert_eq!(cell.get(), 0);
    assert!(std::ptr::eq(h2.get_ref().unwrap().0, cell));

    std::mem::drop(h2);

    assert_eq!(cell.get(), 1);
    assert_balanced(before);
}

#[test]
fn observed_strong_references()
{
    let before = thread_local_stats();
    let cell = drop_cell();

    let a = build_observed(DropIncrementer(cell));
    let b = a.clone();
    let c = b.clone();

    assert_eq!(a.strong_count(), 3u64);
    assert_eq!(c.get_ref_counter().map(|r| r.total_count()), Some(3u64.into()));

    std::mem::drop(b);
    std::mem::drop(a);
    assert_eq!(cell.get(), 0);
    assert_eq!(c.strong_count(), 1u64);

    std::mem::drop(c);
    assert_eq!(cell.get(), 1);
    assert_balanced(before);
}

#[test]
fn weak_reference_holds_the_block()
{
    let before = thread_local_stats();
    let cell = drop_cell();

    let a = Observed::new(DropIncrementer(cell));
    let w = a.downgrade();
    let w2 = w.clone();

    assert_eq!(a.weak_count(), 2u64);
    assert!(w.is_alive());
    {
        let up = w.upgrade().unwrap();
        assert_eq!(up.strong_count(), 2u64);
        assert!(up == a);
    }

    std::mem::drop(a);

    assert_eq!(cell.get(), 1);
    assert!(!w.is_alive());
    assert!(w.upgrade().is_none());
    assert_eq!(w.strong_count(), 0u64);
    assert_eq!(thread_local_stats().live_counters(), before.live_counters() + 1);

    std::mem::drop(w);
    assert_eq!(w2.weak_count(), 1u64);
    std::mem::drop(w2);

    assert_balanced(before);
}

#[test]
fn pinned_block_outlives_owners()
{
    let before = thread_local_stats();
    let cell = drop_cell();

    let a = Observed::new(DropIncrementer(cell));
    let b = a.clone();
    let block = NonNull::from(a.get_ref_counter().unwrap());
    unsafe { block.as_ref() }.inc_weak();

    std::mem::drop(a);
    std::mem::drop(b);

    let held = unsafe { block.as_ref() };
    assert_eq!(cell.get(), 1);
    assert!(held.has_no_strong_ref());
    assert!(!held.has_no_reference());
    assert_eq!(thread_local_stats().live_counters(), before.live_counters() + 1);

    held.dec_weak();
    assert!(held.has_no_reference());
    unsafe { RawRef::<DropIncrementer, RefCountBlock>::free_counter(block) };

    assert_balanced(before);
}

#[test]
fn weak_dropped_by_the_value_it_observes()
{
    struct SelfObserving
    {
        me: RefCell<Weak<SelfObserving>>,
        dropped: &'static Cell<i32>,
    }
    impl Drop for SelfObserving
    {
        fn drop(&mut self)
        {
            assert!(self.me.borrow().upgrade().is_none());
            self.dropped.set(self.dropped.get() + 1);
        }
    }

    let before = thread_local_stats();
    let cell = drop_cell();

    let a = Observed::new(SelfObserving {
        me: RefCell::new(Weak::new()),
        dropped: cell,
    });
    *a.me.borrow_mut() = a.downgrade();
    assert_eq!(a.weak_count(), 1u64);

    std::mem::drop(a);

    assert_eq!(cell.get(), 1);
    assert_balanced(before);
}

#[test]
fn observed_reset_leaves_old_block_to_its_weaks()
{
    let before = thread_local_stats();
    let cell = drop_cell();

    let mut a = Observed::new(DropIncrementer(cell));
    let w = a.downgrade();

    a.reset(Some(Box::new(DropIncrementer(cell))));

    assert_eq!(cell.get(), 1);
    assert!(!w.is_alive());
    assert_eq!(w.weak_count(), 1u64);
    assert!(w != a);
    assert_eq!(a.strong_count(), 1u64);
    assert_eq!(a.weak_count(), 0u64);
    assert_eq!(thread_local_stats().live_counters(), before.live_counters() + 2);

    std::mem::drop(w);
    assert_eq!(thread_local_stats().live_counters(), before.live_counters() + 1);
    std::mem::drop(a);
    assert_eq!(cell.get(), 2);

    let n = unsafe { Observed::<u8>::from_raw(std::ptr::null_mut()) };
    assert!(n.is_empty());
    assert!(n.get_ref_counter().is_none());
    assert_eq!(n.strong_count(), 0u64);

    assert_balanced(before);
}

#[test]
fn moves_do_not_touch_counts()
{
    let mut h1 = Shared::new(5);
    let keep = h1.clone();
    let raw = h1.get();

    let h2 = h1.take();

    assert!(h1.is_empty());
    assert_eq!(h1.count(), 0u64);
    assert!(h1.get().is_null());
    assert_eq!(h2.get(), raw);
    assert_eq!(h2.count(), 2u64);
    assert_eq!(keep.count(), 2u64);

    let mut o1 = Observed::new("moved");
    let o2 = o1.take();
    assert!(o1.is_empty() && o2.is_some());
    assert_eq!(o2.strong_count(), 1u64);

    let mut e1 = Exclusive::new(1u8);
    let e2 = e1.take();
    assert!(e1.is_empty() && e2.is_some());
}

#[test]
fn release_round_trip()
{
    let before = thread_local_stats();
    let cell = drop_cell();

    let mut e = Exclusive::new(DropIncrementer(cell));
    let raw = e.release_raw();

    assert!(e.is_empty());
    assert!(e.release().is_none());
    assert!(!raw.is_null());

    let again = unsafe { Exclusive::from_raw(raw) };
    assert_eq!(again.as_ptr(), raw as *const _);
    std::mem::drop(e);
    assert_eq!(cell.get(), 0);
    std::mem::drop(again);

    assert_eq!(cell.get(), 1);
    assert_balanced(before);
}

#[test]
fn exclusive_reset_and_into_inner()
{
    let before = thread_local_stats();
    let cell = drop_cell();

    let mut e: Exclusive<DropIncrementer> = Exclusive::default();
    e.reset(Some(Box::new(DropIncrementer(cell))));
    let raw = e.as_ptr() as *mut DropIncrementer;
    unsafe { e.reset_raw(raw) };
    assert_eq!(cell.get(), 0);

    e.reset(None);
    assert_eq!(cell.get(), 1);
    assert!(e.get().is_none());

    let mut v = Exclusive::new(vec![1, 2]);
    v.push(3);
    assert_eq!(v.into_inner(), Some(vec![1, 2, 3]));
    assert_eq!(Exclusive::<u8>::empty().into_inner(), None);

    assert_balanced(before);
}

#[test]
fn exclusive_crosses_threads()
{
    let e = Exclusive::new(String::from("sent"));
    let back = std::thread::spawn(move || e.into_inner())
        .join()
        .unwrap();
    assert_eq!(back.as_deref(), Some("sent"));
}

#[test]
fn shared_reset_detaches_one_owner()
{
    let before = thread_local_stats();
    let cell = drop_cell();

    let mut a = Shared::new(DropIncrementer(cell));
    let b = a.clone();

    let raw = a.get() as *mut DropIncrementer;
    unsafe { a.reset_raw(raw) };
    assert_eq!(a.count(), 2u64);

    a.reset(Some(Box::new(DropIncrementer(cell))));
    assert_eq!(cell.get(), 0);
    assert_eq!(a.count(), 1u64);
    assert_eq!(b.count(), 1u64);
    assert!(!a.ptr_eq(&b));

    std::mem::drop(b);
    assert_eq!(cell.get(), 1);
    a.reset(None);
    assert_eq!(cell.get(), 2);
    assert!(a.is_empty());

    let n = unsafe { Shared::<u8>::from_raw(std::ptr::null_mut()) };
    assert!(n.is_empty());
    assert!(n == Shared::default());

    assert_balanced(before);
}

#[test]
fn sole_owner_can_take_the_value()
{
    let before = thread_local_stats();

    let mut a = Shared::new(vec![1]);
    a.get_mut().unwrap().push(2);
    let b = a.clone();
    assert!(a.get_mut().is_none());

    let a = a.try_into_inner().unwrap_err();
    std::mem::drop(b);
    assert_eq!(a.try_into_inner().ok(), Some(vec![1, 2]));

    let stats = thread_local_stats();
    assert_eq!(stats.values_released, before.values_released + 1);
    assert_balanced(before);
}

#[test]
fn destructor_runs_once_in_any_scope_order()
{
    let orders: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    let before = thread_local_stats();

    for order in orders {
        let cell = drop_cell();
        let mut aliases: Vec<Option<Shared<DropIncrementer>>> = Vec::new();
        {
            let root = Shared::new(DropIncrementer(cell));
            {
                aliases.push(Some(root.clone()));
                {
                    aliases.push(Some(root.clone()));
                    aliases.push(Some(aliases[1].as_ref().unwrap().clone()));
                }
            }
            assert_eq!(root.count(), 4u64);
        }

        for (i, &slot) in order.iter().enumerate() {
            assert_eq!(cell.get(), 0);
            aliases[slot] = None;
            let remaining = 2 - i as u64;
            if let Some(live) = aliases.iter().flatten().next() {
                assert_eq!(live.count(), remaining);
            }
        }
        assert_eq!(cell.get(), 1);
    }

    assert_balanced(before);
}

#[test]
#[cfg(not(feature = "abort_on_fault"))]
#[should_panic(expected = "dereferenced an empty `Shared`")]
fn empty_shared_deref_faults()
{
    let s: Shared<u8> = Shared::empty();
    let _v: u8 = *s;
}

#[test]
#[cfg(not(feature = "abort_on_fault"))]
#[should_panic(expected = "[ERR]: logic error")]
fn empty_exclusive_deref_faults()
{
    let mut e: Exclusive<u8> = Exclusive::empty();
    *e = 1;
}

#[test]
#[cfg(feature = "global")]
fn thread_exit_folds_into_global()
{
    let before = global_stats();

    std::thread::spawn(|| {
        let a = Observed::new(1);
        let _w = a.downgrade();
        let _s = Shared::new(2);
        let _e = Exclusive::new(3);
    })
    .join()
    .unwrap();

    let after = global_stats();
    assert!(after.values_adopted >= before.values_adopted + 3);
    assert!(after.counters_allocated >= before.counters_allocated + 2);
}

#[test]
#[cfg(feature = "global")]
fn flush_moves_local_stats()
{
    let _s = Shared::new(0u8);
    assert!(thread_local_stats().values_adopted >= 1);
    let before = global_stats();

    flush();

    assert_eq!(thread_local_stats(), Stats::default());
    assert!(global_stats().values_adopted >= before.values_adopted + 1);
}

#[test]
#[cfg(feature = "global")]
fn net_figures_show_drops_after_flush()
{
    let s = Shared::new(0u8);
    flush();

    std::mem::drop(s);

    let stats = thread_local_stats();
    assert_eq!(stats.live_values(), 0);
    assert_eq!(stats.net_values(), -1);
    assert_eq!(stats.net_counters(), -1);
}
