//! Benchmarks for effect application and effect aging.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hearth_abilities::{
    AbilitySystemComponent, AttributeId, AttributeModifier, CalculatorType, GameplayEffect, TargetContext,
    GameplayAbility, TargetingType,
};

fn bench_apply_calculated(c: &mut Criterion) {
    let attacker = AbilitySystemComponent::with_defaults(1);
    let victim = AbilitySystemComponent::with_defaults(2);
    attacker.set(AttributeId::ATTACK_DAMAGE, 1.0);
    let hit = Arc::new(GameplayEffect::new("Hit").with_modifier(AttributeModifier::calculated(
        AttributeId::HEALTH,
        CalculatorType::SourceDamage,
        1.0,
    )));

    c.bench_function("apply_calculated_effect", |b| {
        b.iter(|| {
            victim.set(AttributeId::HEALTH, 1_000.0);
            black_box(attacker.apply_effect_to_target(black_box(&hit), &victim))
        });
    });
}

fn bench_tick_many_effects(c: &mut Criterion) {
    let asc = AbilitySystemComponent::with_defaults(1);
    let dot = Arc::new(GameplayEffect::new("Dot").with_duration(1.0e9).granting("Burning"));
    for _ in 0..256 {
        asc.apply_effect_to_self(&dot);
    }

    c.bench_function("tick_256_active_effects", |b| {
        b.iter(|| black_box(asc.tick(black_box(1.0 / 30.0))));
    });
}

fn bench_activate_with_cooldown(c: &mut Criterion) {
    let hero = Arc::new(AbilitySystemComponent::with_defaults(1));
    let enemy = Arc::new(AbilitySystemComponent::with_defaults(2));
    let cooldown = Arc::new(GameplayEffect::new("Cd").with_duration(0.01).granting("Cooldown.Strike"));
    let hit = Arc::new(GameplayEffect::new("Hit").with_modifier(AttributeModifier::add(AttributeId::HEALTH, -1.0)));
    let handle = hero.give_ability(Arc::new(
        GameplayAbility::new("Strike")
            .applying(hit)
            .with_cooldown(cooldown)
            .targeting(TargetingType::Explicit, true),
    ));
    let ctx = TargetContext::target(enemy);

    c.bench_function("activate_then_expire_cooldown", |b| {
        b.iter(|| {
            let ok = hero.try_activate_ability(handle, &ctx);
            hero.tick(0.02);
            black_box(ok)
        });
    });
}

criterion_group!(benches, bench_apply_calculated, bench_tick_many_effects, bench_activate_with_cooldown);
criterion_main!(benches);
